//! Admission service implementation.

use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, instrument, warn};

use super::proto::turnstile::v1::{
    admission_service_server::AdmissionService, Algorithm as ProtoAlgorithm, CheckRequest,
    CheckResponse,
};
use crate::admission::{AdmissionEngine, Algorithm};

/// Implementation of the AdmissionService gRPC interface.
///
/// The engine only hands back a boolean; translating a denial into a
/// response code stays with the caller of this service.
pub struct AdmissionServiceImpl {
    /// The admission engine instance
    engine: Arc<AdmissionEngine>,
}

impl AdmissionServiceImpl {
    /// Create a new AdmissionServiceImpl over the given engine.
    pub fn new(engine: Arc<AdmissionEngine>) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl AdmissionService for AdmissionServiceImpl {
    /// Decide whether a single request from a client may proceed.
    #[instrument(
        skip(self, request),
        fields(client_key = %request.get_ref().client_key)
    )]
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let req = request.into_inner();

        // Validate the request
        if req.client_key.is_empty() {
            warn!("Received admission check with empty client key");
            return Err(Status::invalid_argument("client_key is required"));
        }

        let algorithm = match req.algorithm() {
            ProtoAlgorithm::FixedWindow => Algorithm::FixedWindow,
            ProtoAlgorithm::SlidingWindow => Algorithm::SlidingWindow,
            ProtoAlgorithm::TokenBucket => Algorithm::TokenBucket,
            ProtoAlgorithm::Unspecified => {
                warn!("Received admission check without an algorithm");
                return Err(Status::invalid_argument("algorithm is required"));
            }
        };

        let allowed = self.engine.check(algorithm, &req.client_key);

        debug!(algorithm = ?algorithm, allowed, "Admission decision returned");

        Ok(Response::new(CheckResponse { allowed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnstileConfig;

    fn test_service() -> AdmissionServiceImpl {
        let config = TurnstileConfig::default();
        let engine = Arc::new(AdmissionEngine::new(&config.admission).unwrap());
        AdmissionServiceImpl::new(engine)
    }

    fn check_request(client_key: &str, algorithm: ProtoAlgorithm) -> Request<CheckRequest> {
        Request::new(CheckRequest {
            client_key: client_key.to_string(),
            algorithm: algorithm as i32,
        })
    }

    #[tokio::test]
    async fn empty_client_key_rejected() {
        let service = test_service();

        let result = service
            .check(check_request("", ProtoAlgorithm::FixedWindow))
            .await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn unspecified_algorithm_rejected() {
        let service = test_service();

        let result = service
            .check(check_request("10.0.0.1", ProtoAlgorithm::Unspecified))
            .await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn valid_request_returns_a_decision() {
        let service = test_service();

        let result = service
            .check(check_request("10.0.0.1", ProtoAlgorithm::TokenBucket))
            .await;
        assert!(result.is_ok());
        assert!(result.unwrap().into_inner().allowed);
    }

    #[tokio::test]
    async fn denial_maps_to_allowed_false_not_an_error() {
        let service = test_service();

        // Default fixed window allows 3 per window; the 4th is denied but
        // the rpc itself still succeeds.
        for _ in 0..3 {
            let response = service
                .check(check_request("10.0.0.1", ProtoAlgorithm::FixedWindow))
                .await
                .unwrap();
            assert!(response.into_inner().allowed);
        }

        let response = service
            .check(check_request("10.0.0.1", ProtoAlgorithm::FixedWindow))
            .await
            .unwrap();
        assert!(!response.into_inner().allowed);
    }
}
