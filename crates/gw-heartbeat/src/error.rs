use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
	#[error("bus publish failed: {0}")]
	Bus(#[from] async_nats::PublishError),
}
