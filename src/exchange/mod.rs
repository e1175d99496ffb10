pub mod adapter;
pub mod gateio;

#[cfg(test)]
pub(crate) mod mock;
