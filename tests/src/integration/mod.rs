//! Cross-crate request flows.

#[cfg(test)]
pub mod support;

#[cfg(test)]
mod auth;
#[cfg(test)]
mod insecure;
#[cfg(test)]
mod secure;
