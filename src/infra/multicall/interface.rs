//! Contract interfaces shared by every call in one multicall batch.

use alloy_json_abi::{Function, JsonAbi};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ScoreError};
use crate::network::Protocol;

#[derive(Debug, Clone)]
pub enum Abi {
    Evm(JsonAbi),
    Starknet(StarknetAbi),
}

impl Abi {
    /// Builds an EVM interface from signatures such as
    /// `function balanceOf(address) view returns (uint256)`.
    pub fn human_readable<I, S>(signatures: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut abi = JsonAbi::default();
        for signature in signatures {
            let signature = signature.as_ref().trim();
            let function = Function::parse(signature)
                .map_err(|err| ScoreError::Abi(format!("Invalid signature `{signature}`: {err}")))?;
            abi.functions
                .entry(function.name.clone())
                .or_default()
                .push(function);
        }
        Ok(Self::Evm(abi))
    }

    /// Accepts either a list of human-readable signatures or a JSON ABI document.
    pub fn evm_json(value: &Value) -> Result<Self> {
        if let Some(items) = value.as_array() {
            if !items.is_empty() && items.iter().all(|v| v.is_string()) {
                return Self::human_readable(items.iter().filter_map(|v| v.as_str()));
            }
        }
        let abi: JsonAbi = serde_json::from_value(value.clone())
            .map_err(|err| ScoreError::Abi(format!("Invalid JSON ABI: {err}")))?;
        Ok(Self::Evm(abi))
    }

    pub fn starknet_json(value: &Value) -> Result<Self> {
        StarknetAbi::from_json(value).map(Self::Starknet)
    }

    pub fn from_json(protocol: Protocol, value: &Value) -> Result<Self> {
        match protocol {
            Protocol::Evm => Self::evm_json(value),
            Protocol::Starknet => Self::starknet_json(value),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Evm(_) => Protocol::Evm,
            Self::Starknet(_) => Protocol::Starknet,
        }
    }

    pub fn as_evm(&self) -> Result<&JsonAbi> {
        match self {
            Self::Evm(abi) => Ok(abi),
            Self::Starknet(_) => Err(ScoreError::Abi(
                "Starknet ABI supplied for an EVM network".to_string(),
            )),
        }
    }

    pub fn as_starknet(&self) -> Result<&StarknetAbi> {
        match self {
            Self::Starknet(abi) => Ok(abi),
            Self::Evm(_) => Err(ScoreError::Abi(
                "EVM ABI supplied for a Starknet network".to_string(),
            )),
        }
    }
}

/// Picks the overload whose arity matches, else the first one declared.
pub fn find_function<'a>(abi: &'a JsonAbi, name: &str, arity: usize) -> Result<&'a Function> {
    let overloads = abi
        .functions
        .get(name)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ScoreError::Abi(format!("Function `{name}` not found in ABI")))?;
    Ok(overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .unwrap_or(&overloads[0]))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarknetOutput {
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarknetFunction {
    pub name: String,
    #[serde(default)]
    pub outputs: Vec<StarknetOutput>,
}

impl StarknetFunction {
    pub fn output_type(&self) -> Option<&str> {
        self.outputs.first().map(|o| o.ty.as_str())
    }
}

/// Function entries of a Cairo ABI. Functions nested in `interface` items are
/// flattened; structs, events and the like are ignored.
#[derive(Debug, Clone, Default)]
pub struct StarknetAbi {
    functions: Vec<StarknetFunction>,
}

impl StarknetAbi {
    pub fn new(functions: Vec<StarknetFunction>) -> Self {
        Self { functions }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| ScoreError::Abi("Starknet ABI must be an array".to_string()))?;
        let mut functions = Vec::new();
        collect_functions(items, &mut functions)?;
        Ok(Self { functions })
    }

    pub fn function(&self, name: &str) -> Option<&StarknetFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn functions(&self) -> &[StarknetFunction] {
        &self.functions
    }
}

fn collect_functions(items: &[Value], out: &mut Vec<StarknetFunction>) -> Result<()> {
    for item in items {
        let kind = item.get("type").and_then(|v| v.as_str()).unwrap_or("function");
        match kind {
            "function" => {
                let function: StarknetFunction = serde_json::from_value(item.clone())
                    .map_err(|err| ScoreError::Abi(format!("Invalid Starknet function: {err}")))?;
                out.push(function);
            }
            "interface" => {
                if let Some(nested) = item.get("items").and_then(|v| v.as_array()) {
                    collect_functions(nested, out)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
