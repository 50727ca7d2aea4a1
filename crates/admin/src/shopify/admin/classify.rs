//! Mutation `userErrors` classification.
//!
//! A handful of rejections mean "already done" and are safe to ignore when a
//! migration is re-run. They are listed here, per mutation, and nowhere else.
//! Everything not in the table is a failure, and so is a payload that mixes
//! a benign message with any other.

use crate::shopify::{AdminShopifyError, UserError};

struct BenignRule {
    operation: &'static str,
    fragments: &'static [&'static str],
}

const BENIGN: &[BenignRule] = &[
    BenignRule {
        operation: "companyLocationAssignRoles",
        fragments: &["already been assigned a role"],
    },
    BenignRule {
        operation: "metafieldDefinitionCreate",
        fragments: &["already exists", "is in use"],
    },
];

/// How a payload's `userErrors` should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No errors.
    Clean,
    /// Every error is a known idempotent rejection.
    Benign,
    /// At least one error is a real failure.
    Failure,
}

fn is_benign(operation: &str, error: &UserError) -> bool {
    let message = error.message.to_lowercase();
    BENIGN
        .iter()
        .filter(|rule| rule.operation == operation)
        .any(|rule| rule.fragments.iter().any(|f| message.contains(f)))
}

/// Classify the `userErrors` returned by `operation` (the payload field
/// name, e.g. `companyCreate`).
#[must_use]
pub fn classify(operation: &str, errors: &[UserError]) -> Classification {
    if errors.is_empty() {
        Classification::Clean
    } else if errors.iter().all(|e| is_benign(operation, e)) {
        Classification::Benign
    } else {
        Classification::Failure
    }
}

/// Turn a payload's `userErrors` into a result.
///
/// # Errors
///
/// Returns [`AdminShopifyError::UserErrors`] unless the list is empty or
/// entirely benign.
pub fn check_user_errors(operation: &str, errors: Vec<UserError>) -> Result<(), AdminShopifyError> {
    match classify(operation, &errors) {
        Classification::Clean => Ok(()),
        Classification::Benign => {
            tracing::debug!(
                operation,
                errors = %errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
                "ignoring benign user errors"
            );
            Ok(())
        }
        Classification::Failure => Err(AdminShopifyError::UserErrors {
            operation: operation.to_owned(),
            errors,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_clean() {
        assert_eq!(classify("companyCreate", &[]), Classification::Clean);
    }

    #[test]
    fn test_duplicate_role_is_benign() {
        let errors = [UserError::message(
            "Company contact has already been assigned a role in the company location.",
        )];
        assert_eq!(
            classify("companyLocationAssignRoles", &errors),
            Classification::Benign
        );
    }

    #[test]
    fn test_benign_message_on_other_operation_fails() {
        let errors = [UserError::message("has already been assigned a role")];
        assert_eq!(classify("companyUpdate", &errors), Classification::Failure);
    }

    #[test]
    fn test_existing_definition_is_benign() {
        let errors = [UserError::message(
            "Key is in use for Product metafields on the 'custom' namespace.",
        )];
        assert_eq!(
            classify("metafieldDefinitionCreate", &errors),
            Classification::Benign
        );
        let errors = [UserError::message("Definition already exists")];
        assert_eq!(
            classify("metafieldDefinitionCreate", &errors),
            Classification::Benign
        );
    }

    #[test]
    fn test_mixed_benign_and_real_is_failure() {
        let errors = vec![
            UserError::message("has already been assigned a role"),
            UserError::message("Company location does not exist"),
        ];
        assert_eq!(
            classify("companyLocationAssignRoles", &errors),
            Classification::Failure
        );
        let err = check_user_errors("companyLocationAssignRoles", errors);
        assert!(matches!(err, Err(AdminShopifyError::UserErrors { .. })));
    }

    #[test]
    fn test_unknown_message_is_failure() {
        let errors = vec![UserError::message("Name can't be blank")];
        assert!(check_user_errors("companyCreate", errors).is_err());
    }
}
