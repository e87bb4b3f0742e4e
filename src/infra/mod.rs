pub mod config;
pub mod multicall;
pub mod rpc;
pub mod structured_log;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, ScoreError};
use config::ApiConfig;
use multicall::ReadProvider;

/// Hands out a read provider per network.
pub trait ProviderFactory {
    fn provider(&self, network: &str) -> Result<Rc<dyn ReadProvider>>;
}

/// Per-request services. Providers are created lazily and shared by every
/// strategy that reads the same network.
pub struct Services {
    pub config: ApiConfig,
    providers: RefCell<HashMap<String, Rc<rpc::RpcClient>>>,
}

impl Services {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            providers: RefCell::new(HashMap::new()),
        }
    }

    pub fn rpc(&self, network: &str) -> Result<Rc<rpc::RpcClient>> {
        let network = network.trim();
        if network.is_empty() {
            return Err(ScoreError::MissingProvider("empty network".to_string()));
        }

        let mut providers = self.providers.borrow_mut();
        let client = providers.entry(network.to_string()).or_insert_with(|| {
            Rc::new(rpc::RpcClient::new(
                self.config.rpc_url(network),
                self.config.rpc_timeout_ms,
                self.config.rpc_max_retries,
            ))
        });
        Ok(Rc::clone(client))
    }
}

impl ProviderFactory for Services {
    fn provider(&self, network: &str) -> Result<Rc<dyn ReadProvider>> {
        let client: Rc<dyn ReadProvider> = self.rpc(network)?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoizes_one_client_per_network() {
        let services = Services::new(ApiConfig::default());
        let a = services.rpc("1").unwrap();
        let b = services.rpc(" 1 ").unwrap();
        let c = services.rpc("137").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(c.url(), "https://rpc.snapshot.org/137");
    }

    #[test]
    fn empty_network_has_no_provider() {
        let services = Services::new(ApiConfig::default());
        assert!(matches!(
            services.provider(""),
            Err(ScoreError::MissingProvider(_))
        ));
    }
}
