use serde::Serialize;

/// Chain family of a network; decides which multicall adapter handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Evm,
    Starknet,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct NetworkInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub protocol: Protocol,
    pub multicall: &'static str,
}

const MULTICALL3: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";
const STARKNET_MULTICALL: &str =
    "0x05754af3760f3356da99aea5c3ec39ccac7783d925a19666ebbeca58ff0087f4";

pub const STARKNET_MAINNET: &str = "0x534e5f4d41494e";
pub const STARKNET_SEPOLIA: &str = "0x534e5f5345504f4c4941";

const STARKNET_NETWORKS: [&str; 2] = [STARKNET_MAINNET, STARKNET_SEPOLIA];

const NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        key: "1",
        name: "Ethereum",
        protocol: Protocol::Evm,
        multicall: "0xeefba1e63905ef1d7acba5a8513c70307c1ce441",
    },
    NetworkInfo {
        key: "10",
        name: "OP Mainnet",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "25",
        name: "Cronos",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "56",
        name: "BNB Smart Chain",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "100",
        name: "Gnosis",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "137",
        name: "Polygon",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "250",
        name: "Fantom",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "8453",
        name: "Base",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "42161",
        name: "Arbitrum One",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "43114",
        name: "Avalanche",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: "11155111",
        name: "Sepolia",
        protocol: Protocol::Evm,
        multicall: MULTICALL3,
    },
    NetworkInfo {
        key: STARKNET_MAINNET,
        name: "Starknet",
        protocol: Protocol::Starknet,
        multicall: STARKNET_MULTICALL,
    },
    NetworkInfo {
        key: STARKNET_SEPOLIA,
        name: "Starknet Sepolia",
        protocol: Protocol::Starknet,
        multicall: STARKNET_MULTICALL,
    },
];

pub fn list() -> &'static [NetworkInfo] {
    NETWORKS
}

pub fn get(network: &str) -> Option<&'static NetworkInfo> {
    let network = network.trim();
    NETWORKS.iter().find(|n| n.key.eq_ignore_ascii_case(network))
}

/// Any identifier outside the Starknet set is treated as EVM, registered or not.
pub fn protocol(network: &str) -> Protocol {
    let network = network.trim();
    if STARKNET_NETWORKS
        .iter()
        .any(|id| id.eq_ignore_ascii_case(network))
    {
        Protocol::Starknet
    } else {
        Protocol::Evm
    }
}

pub fn multicall_address(network: &str) -> Option<&'static str> {
    get(network).map(|n| n.multicall)
}
