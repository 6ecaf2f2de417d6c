//! Turns scheme tokens into resolved layers.

use std::collections::HashMap;

use tracing::debug;

use super::layer::{Layer, LayerImplementation};
use crate::creators::Creators;
use crate::error::{Error, Result};

/// Scheme token separator.
pub const SCHEME_SEPARATOR: char = '+';

/// Splits a scheme such as `tcp+tls+yamux` into its tokens.
#[must_use]
pub fn split_scheme(scheme: &str) -> Vec<String> {
    scheme
        .split(SCHEME_SEPARATOR)
        .map(str::trim)
        .map(str::to_string)
        .collect()
}

/// Resolves one token, trying categories in fixed priority. With solutions
/// enabled the all-in-one categories are tried first.
#[must_use]
pub fn resolve_layer(
    creators: &Creators,
    name: &str,
    parameters_index: usize,
    enable_solutions: bool,
) -> Option<Layer> {
    let implementation = find_implementation(creators, name, enable_solutions)?;
    Some(Layer {
        implementation_name: name.to_string(),
        implementation,
        parameters_index,
    })
}

fn find_implementation(
    creators: &Creators,
    name: &str,
    enable_solutions: bool,
) -> Option<LayerImplementation> {
    if enable_solutions {
        if let Some(imp) = creators.addr_solutions().get(name) {
            return Some(LayerImplementation::AddrSolution(imp));
        }
        if let Some(imp) = creators.stream_solutions().get(name) {
            return Some(LayerImplementation::StreamSolution(imp));
        }
        if let Some(imp) = creators.packet_solutions().get(name) {
            return Some(LayerImplementation::PacketSolution(imp));
        }
    }
    creators
        .packet_obfuscators()
        .get(name)
        .map(LayerImplementation::PacketObfuscator)
        .or_else(|| {
            creators
                .stream_obfuscators()
                .get(name)
                .map(LayerImplementation::StreamObfuscator)
        })
        .or_else(|| {
            creators
                .packet_adapters()
                .get(name)
                .map(LayerImplementation::PacketAdapter)
        })
        .or_else(|| {
            creators
                .stream_adapters()
                .get(name)
                .map(LayerImplementation::StreamAdapter)
        })
        .or_else(|| {
            creators
                .stream_conns()
                .get(name)
                .map(LayerImplementation::StreamConn)
        })
        .or_else(|| {
            creators
                .packet_conns()
                .get(name)
                .map(LayerImplementation::PacketConn)
        })
}

/// Resolves every token into one layer, index 0 being the bottom of the stack.
///
/// Tokens are visited right to left and each repeated name receives the next
/// occurrence index in that order. When `enforce_compatibility` is set,
/// adjacent layers must satisfy the compatibility matrix and only the bottom
/// layer may be a terminal transport. The bottom layer itself may be
/// non-terminal because the chainer inserts a default transport beneath it.
///
/// # Errors
///
/// [`Error::SchemeNotSupported`] for an empty scheme or an unresolvable token,
/// [`Error::IncompatibleLayers`] for a rejected adjacent pair. No partial
/// chain is returned.
pub fn resolve_layers(
    creators: &Creators,
    tokens: &[String],
    enable_solutions: bool,
    enforce_compatibility: bool,
) -> Result<Vec<Layer>> {
    if tokens.is_empty() || tokens.iter().any(String::is_empty) {
        return Err(Error::SchemeNotSupported(tokens.join("+")));
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut resolved: Vec<Option<Layer>> = vec![None; tokens.len()];
    for (position, name) in tokens.iter().enumerate().rev() {
        let occurrence = occurrences.entry(name.as_str()).or_insert(0);
        let layer = resolve_layer(creators, name, *occurrence, enable_solutions)
            .ok_or_else(|| Error::SchemeNotSupported(name.clone()))?;
        *occurrence += 1;
        resolved[position] = Some(layer);
    }
    let layers: Vec<Layer> = resolved.into_iter().flatten().collect();

    if enforce_compatibility {
        check_compatibility(&layers)?;
    }

    debug!(
        layers = %layers.iter().map(ToString::to_string).collect::<Vec<_>>().join(" <- "),
        "resolved scheme"
    );
    Ok(layers)
}

fn check_compatibility(layers: &[Layer]) -> Result<()> {
    for pair in layers.windows(2) {
        let (below, above) = (&pair[0], &pair[1]);
        if !above.is_compatible_with(Some(below)) {
            return Err(Error::IncompatibleLayers {
                above: above.to_string(),
                below: below.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_trims_tokens() {
        assert_eq!(split_scheme("tcp + tls+yamux"), vec!["tcp", "tls", "yamux"]);
        assert_eq!(split_scheme("tcp"), vec!["tcp"]);
    }

    #[test]
    fn empty_scheme_is_rejected() {
        let creators = Creators::new();
        let err = resolve_layers(&creators, &[], true, true).unwrap_err();
        assert!(matches!(err, Error::SchemeNotSupported(_)));

        let err = resolve_layers(&creators, &split_scheme("tcp++tls"), true, true).unwrap_err();
        assert!(matches!(err, Error::SchemeNotSupported(_)));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let creators = Creators::new();
        let err = resolve_layers(&creators, &split_scheme("nosuch"), true, false).unwrap_err();
        assert!(matches!(err, Error::SchemeNotSupported(name) if name == "nosuch"));
    }
}
