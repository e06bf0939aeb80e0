use crate::api::{ApiError, AuthContext, SalesApi};
use crate::catalog::Client;
use crate::pricing::{PricedLine, QuoteTotals};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod types;

pub use types::{Quotation, QuotationLine, QuotationPayload, QuotationStatus, ShippingVariant};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("No client selected for the quotation")]
    MissingClient,

    #[error("Lines without a resolved price basis: {0:?}")]
    InvalidPriceBasis(Vec<String>),

    #[error("Lines with a non-positive quantity: {0:?}")]
    InvalidQuantity(Vec<String>),
}

#[derive(Debug, Error)]
pub enum QuotationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] ApiError),
}

/// Validates and assembles the creation payload. Pure: nothing is sent from
/// here, so a failed build leaves the in-progress cart untouched.
///
/// Checks run in order: a client must be selected, every line needs a
/// resolved price basis, every quantity must be positive.
pub fn build_quotation(
    client: Option<&Client>,
    lines: &[PricedLine],
    tipo_envio: ShippingVariant,
    costo_envio: Decimal,
) -> Result<QuotationPayload, ValidationError> {
    let client = client.ok_or(ValidationError::MissingClient)?;

    let unpriced: Vec<String> = lines
        .iter()
        .filter(|l| l.tipo_precio.is_none() || l.precio_base.is_none())
        .map(|l| l.product.id.clone())
        .collect();
    if !unpriced.is_empty() {
        return Err(ValidationError::InvalidPriceBasis(unpriced));
    }

    let non_positive: Vec<String> = lines
        .iter()
        .filter(|l| l.cantidad <= Decimal::ZERO)
        .map(|l| l.product.id.clone())
        .collect();
    if !non_positive.is_empty() {
        return Err(ValidationError::InvalidQuantity(non_positive));
    }

    let costo_envio = costo_envio.max(Decimal::ZERO);
    let totals = QuoteTotals::compute(lines, costo_envio);

    // every line passed validation, so basis and price are present
    let productos: Vec<QuotationLine> = lines
        .iter()
        .filter_map(|l| {
            let tipo_variante = l.tipo_precio?;
            // rounded here, at the serialization boundary
            let precio_unitario = l.unit_price()?.round_dp(2);
            Some(QuotationLine {
                producto_id: l.product.id.clone(),
                nombre: l.product.nombre.clone(),
                cantidad: l.cantidad,
                precio_unitario,
                tipo_variante,
            })
        })
        .collect();

    Ok(QuotationPayload {
        cliente_id: client.id.clone(),
        cliente_nombre: client.nombre.clone(),
        fecha: Utc::now(),
        tipo_envio,
        costo_envio,
        productos,
        total: totals.total.round_dp(2),
    })
}

#[derive(Clone)]
pub struct QuotationService {
    api: Arc<dyn SalesApi>,
}

impl QuotationService {
    pub fn new(api: Arc<dyn SalesApi>) -> Self {
        Self { api }
    }

    /// Validates locally, then submits. Validation failures never reach the
    /// network; persistence failures propagate so the caller can keep the
    /// cart and retry.
    pub async fn submit(
        &self,
        auth: &AuthContext,
        client: Option<&Client>,
        lines: &[PricedLine],
        tipo_envio: ShippingVariant,
        costo_envio: Decimal,
    ) -> Result<Quotation, QuotationError> {
        let payload = build_quotation(client, lines, tipo_envio, costo_envio)?;
        let quotation = self.api.create_quotation(auth, &payload).await?;
        info!(id = %quotation.id, total = %quotation.total, "quotation created");
        Ok(quotation)
    }

    /// Cancels a quotation. Cancelling one that is already cancelled is a
    /// no-op success and makes no network round trip.
    pub async fn cancel(
        &self,
        auth: &AuthContext,
        quotation: &Quotation,
    ) -> Result<Quotation, ApiError> {
        if quotation.is_cancelled() {
            return Ok(quotation.clone());
        }
        self.api.cancel_quotation(auth, &quotation.id).await?;
        info!(id = %quotation.id, "quotation cancelled");
        let mut cancelled = quotation.clone();
        cancelled.estado = QuotationStatus::Cancelada;
        Ok(cancelled)
    }
}
