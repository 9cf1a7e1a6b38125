use base64::{engine::general_purpose::STANDARD, Engine};

/// Builds the outbound envelope for a single bus message, deciding its
/// `payload_format` tag: `json` when the raw bytes parse as JSON, `text`
/// when they're valid UTF-8 but not JSON, `binary` (base64-wrapped)
/// otherwise.
pub fn build_envelope(subject: &str, raw: &[u8]) -> String {
	let (data, format) = match std::str::from_utf8(raw) {
		Ok(text) => match serde_json::from_str::<serde_json::Value>(text) {
			Ok(value) => (value, "json"),
			Err(_) => (serde_json::Value::String(text.to_string()), "text"),
		},
		Err(_) => {
			let encoded = STANDARD.encode(raw);
			(serde_json::json!({ "encoding": "base64", "value": encoded }), "binary")
		}
	};

	serde_json::json!({
		"subject": subject,
		"data": data,
		"payload_format": format,
	})
	.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_payload_is_parsed_and_tagged() {
		let envelope = build_envelope("a.b", br#"{"x":1}"#);
		let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
		assert_eq!(value["subject"], "a.b");
		assert_eq!(value["payload_format"], "json");
		assert_eq!(value["data"]["x"], 1);
	}

	#[test]
	fn plain_text_payload_is_tagged_text() {
		let envelope = build_envelope("a.b", b"hello world");
		let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
		assert_eq!(value["payload_format"], "text");
		assert_eq!(value["data"], "hello world");
	}

	#[test]
	fn non_utf8_payload_is_base64_wrapped() {
		let raw: &[u8] = &[0xff, 0xfe, 0x00, 0x01];
		let envelope = build_envelope("a.b", raw);
		let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
		assert_eq!(value["payload_format"], "binary");
		assert_eq!(value["data"]["encoding"], "base64");
		let decoded = STANDARD.decode(value["data"]["value"].as_str().unwrap()).unwrap();
		assert_eq!(decoded, raw);
	}
}
