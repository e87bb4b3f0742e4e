use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Missing multicall address for network {network}")]
    MissingMulticallAddress { network: String },

    #[error("No provider for network {0}")]
    MissingProvider(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Multicall page {page} failed: {source}")]
    BatchExecution {
        page: usize,
        #[source]
        source: Box<ScoreError>,
    },

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

impl ScoreError {
    pub fn invalid_request(message: String) -> Self {
        Self::InvalidRequest(message)
    }

    pub fn method_not_found(message: String) -> Self {
        Self::MethodNotFound(message)
    }

    pub fn invalid_params(message: String) -> Self {
        Self::InvalidParams(message)
    }

    pub fn missing_multicall_address(network: &str) -> Self {
        Self::MissingMulticallAddress {
            network: network.to_string(),
        }
    }

    pub fn batch_execution(page: usize, source: ScoreError) -> Self {
        Self::BatchExecution {
            page,
            source: Box::new(source),
        }
    }

    /// Errors a provider may retry. JSON-RPC error responses are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn to_json_rpc_error(&self) -> (i32, String, Option<Value>) {
        match self {
            Self::InvalidRequest(_) => (-32600, self.to_string(), None),
            Self::MethodNotFound(_) => (-32601, self.to_string(), None),
            Self::InvalidParams(_) => (-32602, self.to_string(), None),
            Self::InvalidAddress(_) => (-32602, self.to_string(), None),
            Self::UnknownStrategy(_) => (-32602, self.to_string(), None),
            Self::Abi(_) => (-32602, self.to_string(), None),
            Self::MissingMulticallAddress { network } => (
                -32010,
                self.to_string(),
                Some(serde_json::json!({ "network": network })),
            ),
            Self::MissingProvider(_) => (-32501, self.to_string(), None),
            Self::RpcError(_) => (-32500, self.to_string(), None),
            Self::Transport(_) => (-32501, self.to_string(), None),
            Self::BatchExecution { page, source } => {
                let (inner_code, _, _) = source.to_json_rpc_error();
                (
                    inner_code,
                    self.to_string(),
                    Some(serde_json::json!({ "page": page })),
                )
            }
            Self::Decode(_) => (-32500, self.to_string(), None),
        }
    }
}
