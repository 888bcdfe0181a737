//! Shared proptest strategies.

use proptest::prelude::*;

use crate::value::{ParamType, FALSY_TOKENS, TRUTHY_TOKENS};

pub fn arb_param_type() -> impl Strategy<Value = ParamType> {
    prop_oneof![
        Just(ParamType::String),
        Just(ParamType::Number),
        Just(ParamType::Integer),
        Just(ParamType::Bool),
    ]
}

/// Any spelling of a known type token, with random casing.
pub fn arb_type_token() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec![
            "string", "number", "float", "double", "integer", "short", "bool", "boolean",
        ]),
        any::<bool>(),
    )
        .prop_map(|(token, upper)| {
            if upper {
                token.to_ascii_uppercase()
            } else {
                token.to_string()
            }
        })
}

pub fn arb_bool_token() -> impl Strategy<Value = String> {
    prop::sample::select(TRUTHY_TOKENS.iter().chain(FALSY_TOKENS.iter()).copied().collect::<Vec<_>>())
        .prop_map(str::to_string)
}

/// Well-formed numeric text: integers and decimals, optionally negative.
pub fn arb_number_text() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<i32>().prop_map(|n| n.to_string()),
        (any::<i32>(), 0u32..1000).prop_map(|(i, f)| format!("{}.{}", i, f)),
        (-1.0e12f64..1.0e12).prop_map(|n| n.to_string()),
    ]
}

/// A type token paired with a default text that coerces for that type.
pub fn arb_shorthand_default() -> impl Strategy<Value = (String, String)> {
    prop_oneof![
        ("[a-z][a-z ]{0,10}").prop_map(|s| ("string".to_string(), s)),
        arb_number_text().prop_map(|s| ("number".to_string(), s)),
        arb_number_text().prop_map(|s| ("Float".to_string(), s)),
        arb_bool_token().prop_map(|s| ("boolean".to_string(), s)),
    ]
}

/// Keys used for request parameters in generated requests.
pub fn arb_param_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}
