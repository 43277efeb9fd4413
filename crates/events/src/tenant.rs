use stockledger_core::TenantId;

/// Helper trait for tenant-scoped messages.
///
/// Marks types carrying an associated tenant ID, so infrastructure components
/// (stores, workers) can validate that a message belongs to the tenant they
/// are operating for without knowing the concrete message type.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}
