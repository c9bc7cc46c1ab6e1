use tracing::instrument;

use super::PelotonClient;
use crate::response::{validate_transport, ApiOutcome};

const CONTEXT: &str = "user overview retrieval";

impl PelotonClient {
    /// GET `/api/user/{user_id}/overview`. Needs the session from `login`.
    #[instrument(level = "info", skip(self))]
    pub async fn user_overview(&self, user_id: &str) -> ApiOutcome {
        let url = match self.endpoint(["api", "user", user_id, "overview"], CONTEXT) {
            Ok(url) => url,
            Err(failure) => return ApiOutcome::Failure(failure),
        };
        let req = self
            .client
            .get(url)
            .header("Peloton-Platform", self.api.platform.as_str());
        validate_transport(self.send(req).await, CONTEXT)
    }
}
