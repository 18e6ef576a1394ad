pub mod calculation;
pub mod dashboard;
pub mod department;
pub mod employee;
pub mod kpi;
pub mod kpi_record;
pub mod notification;
pub mod reward_program;

/// Log a database failure and hide the details from the client.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

pub(crate) fn message(text: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "message": text.into() })
}

/// Constraint a rejected write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    Duplicate,
    MissingReference,
}

/// MySQL reports both unique and foreign key failures as SQLSTATE 23000,
/// so tell them apart by error kind.
pub(crate) fn violation(e: &sqlx::Error) -> Option<Violation> {
    let db_err = e.as_database_error()?;
    if db_err.is_unique_violation() {
        Some(Violation::Duplicate)
    } else if db_err.is_foreign_key_violation() {
        Some(Violation::MissingReference)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct Rejected(&'static str);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Rejected {}

    impl DatabaseError for Rejected {
        fn message(&self) -> &str {
            self.0
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                "Duplicate entry" => ErrorKind::UniqueViolation,
                "Cannot add or update a child row" => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn rejected(msg: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Rejected(msg)))
    }

    #[test]
    fn tells_duplicates_from_missing_references() {
        assert_eq!(violation(&rejected("Duplicate entry")), Some(Violation::Duplicate));
        assert_eq!(
            violation(&rejected("Cannot add or update a child row")),
            Some(Violation::MissingReference)
        );
        assert_eq!(violation(&rejected("Lock wait timeout exceeded")), None);
        assert_eq!(violation(&sqlx::Error::RowNotFound), None);
    }
}
