use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Test transport: records every request and answers with a fixed response,
/// or fails every call when constructed with `failing`.
#[derive(Clone)]
pub struct FakeTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    response: Result<HttpResponse, String>,
}

impl FakeTransport {
    pub fn respond_with(status: u16, body: &str) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Err(reason.to_string()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().expect("lock poisoned").push(request);
        match &self.response {
            Ok(response) => Ok(response.clone()),
            Err(reason) => Err(TransportError::Failed {
                url,
                reason: reason.clone(),
            }),
        }
    }
}
