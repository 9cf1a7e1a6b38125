use crate::client::{ClientHandle, ClientId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Outcome of a single `add_subscription` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
	pub added: bool,
}

/// Outcome of a single `remove_subscription` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOutcome {
	pub removed: bool,
	pub emptied: bool,
}

/// Outcome of dropping a client from every subject it was subscribed to.
#[derive(Debug, Clone, Default)]
pub struct ClientRemovalOutcome {
	pub removed_subjects: HashSet<String>,
	pub emptied_subjects: HashSet<String>,
}

#[derive(Default)]
struct RegistryInner {
	by_subject: HashMap<String, HashSet<ClientHandle>>,
	by_client: HashMap<ClientId, (ClientHandle, HashSet<String>)>,
}

/// The bidirectional subject <-> client index.
///
/// All mutating operations and `snapshot_subscribers` are serialized by a
/// single mutex covering both indices together, so a reader can never
/// observe `by_subject` and `by_client` disagreeing. Nothing below ever
/// awaits while the mutex is held.
pub struct SubscriptionRegistry {
	inner: Mutex<RegistryInner>,
}

impl SubscriptionRegistry {
	pub fn new() -> Self {
		Self { inner: Mutex::new(RegistryInner::default()) }
	}

	/// Registers a client with an empty subject set. Idempotent.
	pub fn register_client(&self, client: &ClientHandle) {
		let mut inner = self.inner.lock().expect("registry mutex poisoned");
		inner.by_client.entry(client.id()).or_insert_with(|| (client.clone(), HashSet::new()));
	}

	pub fn add_subscription(&self, subject: &str, client: &ClientHandle) -> AddOutcome {
		let mut inner = self.inner.lock().expect("registry mutex poisoned");

		let added_to_subject = inner.by_subject.entry(subject.to_string()).or_default().insert(client.clone());

		let entry = inner.by_client.entry(client.id()).or_insert_with(|| (client.clone(), HashSet::new()));
		let added_to_client = entry.1.insert(subject.to_string());

		debug_assert_eq!(added_to_subject, added_to_client, "by_subject and by_client drifted for {subject}");

		AddOutcome { added: added_to_subject }
	}

	pub fn remove_subscription(&self, subject: &str, client: &ClientHandle) -> RemoveOutcome {
		let mut inner = self.inner.lock().expect("registry mutex poisoned");
		Self::remove_one(&mut inner, subject, client)
	}

	fn remove_one(inner: &mut RegistryInner, subject: &str, client: &ClientHandle) -> RemoveOutcome {
		let mut removed = false;
		let mut emptied = false;

		if let Some(set) = inner.by_subject.get_mut(subject) {
			removed = set.remove(client);
			if set.is_empty() {
				inner.by_subject.remove(subject);
				emptied = removed;
			}
		}

		if let Some((_, subjects)) = inner.by_client.get_mut(&client.id()) {
			subjects.remove(subject);
		}

		RemoveOutcome { removed, emptied }
	}

	/// Drops a client from every subject it held. Returns both the full
	/// set of subjects it was removed from and the subset that emptied
	/// as a result, so the caller can drive `B.stop` and heartbeat STOP
	/// emissions for exactly the subjects that need them.
	pub fn remove_client(&self, client_id: ClientId) -> ClientRemovalOutcome {
		let mut inner = self.inner.lock().expect("registry mutex poisoned");

		let Some((handle, subjects)) = inner.by_client.remove(&client_id) else {
			return ClientRemovalOutcome::default();
		};

		let mut outcome = ClientRemovalOutcome::default();
		for subject in subjects {
			if let Some(set) = inner.by_subject.get_mut(&subject) {
				set.remove(&handle);
				outcome.removed_subjects.insert(subject.clone());
				if set.is_empty() {
					inner.by_subject.remove(&subject);
					outcome.emptied_subjects.insert(subject);
				}
			}
		}

		outcome
	}

	/// A point-in-time copy of a subject's subscriber set, safe to
	/// iterate without holding the registry lock.
	pub fn snapshot_subscribers(&self, subject: &str) -> Vec<ClientHandle> {
		let inner = self.inner.lock().expect("registry mutex poisoned");
		inner.by_subject.get(subject).map(|set| set.iter().cloned().collect()).unwrap_or_default()
	}

	pub fn subject_count(&self) -> usize {
		self.inner.lock().expect("registry mutex poisoned").by_subject.len()
	}

	pub fn client_count(&self) -> usize {
		self.inner.lock().expect("registry mutex poisoned").by_client.len()
	}

	pub fn is_subscribed(&self, subject: &str, client_id: ClientId) -> bool {
		let inner = self.inner.lock().expect("registry mutex poisoned");
		inner.by_client.get(&client_id).map(|(_, subjects)| subjects.contains(subject)).unwrap_or(false)
	}
}

impl Default for SubscriptionRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::SocketAddr;

	fn client() -> ClientHandle {
		let (tx, _rx) = tokio::sync::mpsc::channel(8);
		let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
		ClientHandle::new(addr, tx)
	}

	#[test]
	fn add_then_remove_is_a_no_op_on_the_index() {
		let registry = SubscriptionRegistry::new();
		let c = client();
		registry.register_client(&c);

		let add = registry.add_subscription("a.b", &c);
		assert!(add.added);
		assert_eq!(registry.subject_count(), 1);

		let remove = registry.remove_subscription("a.b", &c);
		assert!(remove.removed);
		assert!(remove.emptied);
		assert_eq!(registry.subject_count(), 0);
	}

	#[test]
	fn duplicate_add_reports_not_added() {
		let registry = SubscriptionRegistry::new();
		let c = client();
		assert!(registry.add_subscription("a.b", &c).added);
		assert!(!registry.add_subscription("a.b", &c).added);
	}

	#[test]
	fn subject_survives_while_any_client_remains() {
		let registry = SubscriptionRegistry::new();
		let c1 = client();
		let c2 = client();
		registry.add_subscription("a.b", &c1);
		registry.add_subscription("a.b", &c2);

		let remove = registry.remove_subscription("a.b", &c1);
		assert!(remove.removed);
		assert!(!remove.emptied);
		assert_eq!(registry.subject_count(), 1);

		let remove = registry.remove_subscription("a.b", &c2);
		assert!(remove.removed);
		assert!(remove.emptied);
	}

	#[test]
	fn remove_client_reports_affected_and_emptied_subjects() {
		let registry = SubscriptionRegistry::new();
		let c1 = client();
		let c2 = client();
		registry.add_subscription("a", &c1);
		registry.add_subscription("b", &c1);
		registry.add_subscription("b", &c2);

		let outcome = registry.remove_client(c1.id());
		assert_eq!(outcome.removed_subjects, HashSet::from(["a".to_string(), "b".to_string()]));
		assert_eq!(outcome.emptied_subjects, HashSet::from(["a".to_string()]));
		assert_eq!(registry.subject_count(), 1);
		assert_eq!(registry.client_count(), 1);
	}

	#[test]
	fn snapshot_is_a_copy() {
		let registry = SubscriptionRegistry::new();
		let c = client();
		registry.add_subscription("a.b", &c);

		let snapshot = registry.snapshot_subscribers("a.b");
		assert_eq!(snapshot.len(), 1);

		registry.remove_subscription("a.b", &c);
		assert_eq!(snapshot.len(), 1, "snapshot must not observe later mutation");
		assert!(registry.snapshot_subscribers("a.b").is_empty());
	}

	#[test]
	fn unknown_subject_remove_is_a_noop() {
		let registry = SubscriptionRegistry::new();
		let c = client();
		let outcome = registry.remove_subscription("never-subscribed", &c);
		assert!(!outcome.removed);
		assert!(!outcome.emptied);
	}

	#[test]
	fn remove_unknown_client_yields_empty_outcome() {
		let registry = SubscriptionRegistry::new();
		let c = client();
		let outcome = registry.remove_client(c.id());
		assert!(outcome.removed_subjects.is_empty());
		assert!(outcome.emptied_subjects.is_empty());
	}
}
