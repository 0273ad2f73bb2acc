/// Topics to replay after a reconnect, in first-subscribed order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SubscriptionSet {
	topics: Vec<String>,
}

impl SubscriptionSet {
	/// Returns false if the topic was already present
	pub(crate) fn insert(&mut self, topic: &str) -> bool {
		if self.contains(topic) {
			return false;
		}
		self.topics.push(topic.to_string());
		true
	}

	pub(crate) fn remove(&mut self, topic: &str) -> bool {
		let before = self.topics.len();
		self.topics.retain(|t| t != topic);
		self.topics.len() != before
	}

	pub(crate) fn contains(&self, topic: &str) -> bool {
		self.topics.iter().any(|t| t == topic)
	}

	pub(crate) fn topics(&self) -> &[String] {
		&self.topics
	}

	pub(crate) fn len(&self) -> usize {
		self.topics.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.topics.is_empty()
	}
}
