//! The rewrite rules for the bank exports that produce broken descriptions.
//!
//! Each constructor compiles its regular expression once and moves it into the
//! rule, so building the rule list is the only place patterns are compiled.

use regex::Regex;

use crate::rewrite::{Rule, TransactionSplitUpdate};

/// The token the bank export uses in place of a line break.
pub const ESCAPED_LINEBREAK: &str = "; ";

/// Used as the description when the remittance information is empty.
pub const MISSING_DESCRIPTION_PLACEHOLDER: &str = "n/a";

/// Prepended to the purchase clause extracted from PayPal descriptions.
pub const PAYPAL_PREFIX: &str = "PayPal: ";

const ING_DESCRIPTION_PATTERN: &str =
    r"^mandatereference:(.*),creditorid:(.*),remittanceinformation:(.*)$";

// Older exports start with a numeric transaction code, newer ones do not.
const PAYPAL_DESCRIPTION_PATTERN: &str = r"^(?:\d+ )?PP\.\d{4}\.PP \. .+, Ihr (Einkauf bei.+)$";

/// The rules in the order they need to run.
///
/// Line breaks are removed first so that the format rules see the joined
/// description.
///
/// # Errors
/// Returns an error if one of the built-in patterns fails to compile.
pub fn default_rules() -> Result<Vec<Rule>, regex::Error> {
    Ok(vec![
        linebreak_rule(),
        ing_description_rule()?,
        paypal_description_rule()?,
    ])
}

/// Removes the escaped line breaks from the description. Not terminal.
pub fn linebreak_rule() -> Rule {
    Rule::new("Replace escaped linebreaks", false, |current| {
        let description = current.description.replace(ESCAPED_LINEBREAK, "");

        if description == current.description {
            return Ok(None);
        }

        Ok(Some(TransactionSplitUpdate::with_description(description)))
    })
}

/// Splits ING's `mandatereference:..,creditorid:..,remittanceinformation:..`
/// descriptions into their fields. Terminal.
///
/// # Errors
/// Returns an error if the pattern fails to compile.
pub fn ing_description_rule() -> Result<Rule, regex::Error> {
    let pattern = Regex::new(ING_DESCRIPTION_PATTERN)?;

    Ok(Rule::new("ING description format", true, move |current| {
        let Some(captures) = pattern.captures(&current.description) else {
            return Ok(None);
        };

        let capture = |index| {
            captures
                .get(index)
                .map(|group| group.as_str().to_owned())
                .unwrap_or_default()
        };

        let mut description = capture(3);
        if description.is_empty() {
            description = MISSING_DESCRIPTION_PLACEHOLDER.to_owned();
        }

        Ok(Some(TransactionSplitUpdate {
            description,
            mandate_reference: capture(1),
            creditor_id: capture(2),
            ..Default::default()
        }))
    }))
}

/// Replaces PayPal's `PP.1234.PP . <merchant>, Ihr Einkauf bei <merchant>`
/// descriptions with `PayPal: Einkauf bei <merchant>`. Terminal.
///
/// # Errors
/// Returns an error if the pattern fails to compile.
pub fn paypal_description_rule() -> Result<Rule, regex::Error> {
    let pattern = Regex::new(PAYPAL_DESCRIPTION_PATTERN)?;

    Ok(Rule::new("PayPal description format", true, move |current| {
        let purchase = pattern
            .captures(&current.description)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str());

        Ok(purchase.map(|purchase| {
            TransactionSplitUpdate::with_description(format!("{PAYPAL_PREFIX}{purchase}"))
        }))
    }))
}
