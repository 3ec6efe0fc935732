//! LLM client doubles.

/// Mock LLM for testing.
#[cfg(test)]
pub mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::{Error, Result};
    use crate::port::outbound::llm::{CompletionRequest, Llm};

    /// Replies with scripted responses in order, repeating the last one.
    pub struct MockLlm {
        replies: Mutex<VecDeque<Result<String>>>,
        last: Mutex<Option<String>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlm {
        pub fn new(response: impl Into<String>) -> Self {
            Self::scripted(vec![Ok(response.into())])
        }

        pub fn scripted(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                last: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Llm for MockLlm {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().push(request.clone());
            match self.replies.lock().pop_front() {
                Some(Ok(reply)) => {
                    *self.last.lock() = Some(reply.clone());
                    Ok(reply)
                }
                Some(Err(e)) => Err(e),
                None => self
                    .last
                    .lock()
                    .clone()
                    .ok_or_else(|| Error::Connection("no scripted reply".into())),
            }
        }
    }
}
