use crate::api::{ApiError, AuthContext, SalesApi};
use crate::quotation::{Quotation, QuotationLine};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Fulfilment state of a sales order. `completada` is terminal in intent,
/// but any state may be set from any other; operators use backward moves to
/// correct mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Surtiendo,
    EnAlmacen,
    EnEntrega,
    Completada,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Surtiendo,
        OrderStatus::EnAlmacen,
        OrderStatus::EnEntrega,
        OrderStatus::Completada,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completada)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surtiendo => write!(f, "surtiendo"),
            Self::EnAlmacen => write!(f, "en_almacen"),
            Self::EnEntrega => write!(f, "en_entrega"),
            Self::Completada => write!(f, "completada"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("Source quotation has been cancelled")]
    QuotationCancelled,
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Persistence(#[from] ApiError),
}

/// Creation payload for an order derived from a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub cotizacion_id: String,
    pub cliente_id: String,
    pub cliente_nombre: String,
    pub fecha: DateTime<Utc>,
    pub productos: Vec<QuotationLine>,
    pub total: Decimal,
    pub estado: OrderStatus,
    pub comentarios: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: String,
    pub cotizacion_id: String,
    pub cliente_id: String,
    pub cliente_nombre: String,
    pub fecha: DateTime<Utc>,
    pub productos: Vec<QuotationLine>,
    pub total: Decimal,
    #[serde(default)]
    pub estado: OrderStatus,
    #[serde(default)]
    pub comentarios: String,
}

impl SalesOrder {
    /// Any of the four states may be set at any time; no forward-only
    /// progression is enforced. Comments are overwritten as given.
    pub fn set_status(&mut self, estado: OrderStatus, comentarios: impl Into<String>) {
        self.estado = estado;
        self.comentarios = comentarios.into();
    }
}

/// Copies client, totals and line items verbatim from the source quotation.
/// Fails without any I/O when the quotation is cancelled.
pub fn convert_quotation(
    quotation: &Quotation,
    estado: OrderStatus,
    comentarios: impl Into<String>,
) -> Result<OrderPayload, ConversionError> {
    if quotation.is_cancelled() {
        return Err(ConversionError::QuotationCancelled);
    }
    Ok(OrderPayload {
        cotizacion_id: quotation.id.clone(),
        cliente_id: quotation.cliente_id.clone(),
        cliente_nombre: quotation.cliente_nombre.clone(),
        fecha: Utc::now(),
        productos: quotation.productos.clone(),
        total: quotation.total,
        estado,
        comentarios: comentarios.into(),
    })
}

#[derive(Clone)]
pub struct OrderService {
    api: Arc<dyn SalesApi>,
}

impl OrderService {
    pub fn new(api: Arc<dyn SalesApi>) -> Self {
        Self { api }
    }

    pub async fn convert(
        &self,
        auth: &AuthContext,
        quotation: &Quotation,
        estado: OrderStatus,
        comentarios: &str,
    ) -> Result<SalesOrder, OrderError> {
        let payload = convert_quotation(quotation, estado, comentarios)?;
        let order = self.api.create_order(auth, &payload).await?;
        info!(id = %order.id, cotizacion = %order.cotizacion_id, "order created");
        Ok(order)
    }

    pub async fn set_status(
        &self,
        auth: &AuthContext,
        order: &SalesOrder,
        estado: OrderStatus,
        comentarios: &str,
    ) -> Result<SalesOrder, ApiError> {
        let updated = self.api.update_order(auth, &order.id, estado, comentarios).await?;
        info!(id = %order.id, estado = %estado, "order status updated");
        Ok(updated)
    }
}
