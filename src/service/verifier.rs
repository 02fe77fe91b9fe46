use crate::{
    dao::{
        schema::{ADMINISTRATORS, BUILDINGS, EXPENSES},
        store::DocumentStore,
    },
    model::{apperror::ApplicationError, models::VerificationReport},
};

/**
 * Checks that every stored expense record references an existing building. Read only.
 */
pub struct RelationVerifier {
    /**
     * Number of valid relations included in the report for a manual spot check.
     */
    sample_size: usize,
}

impl RelationVerifier {
    /**
     * Creates a new instance of `RelationVerifier`.
     *
     * # Arguments
     * `sample_size`: Number of valid relations to keep as sample.
     */
    pub fn new(sample_size: usize) -> Self {
        RelationVerifier { sample_size }
    }

    /**
     * Joins expense records against buildings, partitions them into valid and invalid relations and counts the collections.
     *
     * # Arguments
     * `store`: Store to verify.
     *
     * # Returns
     * A Result containing the `VerificationReport` or an `ApplicationError`.
     */
    pub async fn verify<S: DocumentStore>(&self, store: &S) -> Result<VerificationReport, ApplicationError> {
        let (valid, invalid): (Vec<_>, Vec<_>) = store.relation_checks().await?.into_iter().partition(|check| check.tiene_relacion);
        for check in &invalid {
            tracing::warn!("Expense depto {} references missing building {}", check.nro_depto, check.edificio_id);
        }
        let report = VerificationReport {
            valid_relations: valid.len(),
            invalid_relations: invalid.len(),
            sample: valid.into_iter().take(self.sample_size).collect(),
            administrator_count: store.count_documents(ADMINISTRATORS).await?,
            building_count: store.count_documents(BUILDINGS).await?,
            expense_count: store.count_documents(EXPENSES).await?,
        };
        Self::log_report(&report);
        Ok(report)
    }

    fn log_report(report: &VerificationReport) {
        tracing::info!("Valid relations: {}", report.valid_relations);
        tracing::info!("Invalid relations: {}", report.invalid_relations);
        for (position, check) in report.sample.iter().enumerate() {
            tracing::info!("{}. Depto {} -> {} | ${}", position + 1, check.nro_depto, check.edificio_nombre.as_deref().unwrap_or("-"), check.monto_total);
        }
        tracing::info!("Administrators: {}", report.administrator_count);
        tracing::info!("Buildings: {}", report.building_count);
        tracing::info!("Expense records: {}", report.expense_count);
        tracing::info!("Valid relations: {}/{}", report.valid_relations, report.expense_count);
        if report.is_consistent() {
            tracing::info!("All expense records reference an existing building");
        } else {
            tracing::warn!("Relations are incomplete. Check the skipped records above and run the verify command after fixing the seed files");
        }
    }
}
