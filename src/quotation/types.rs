use crate::catalog::PriceBasis;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two named delivery services, each with its own entered cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingVariant {
    #[serde(rename = "Servicio de Paquetería")]
    Paqueteria,
    #[serde(rename = "Servicio de Unidades Completas")]
    UnidadesCompletas,
}

impl fmt::Display for ShippingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paqueteria => write!(f, "Servicio de Paquetería"),
            Self::UnidadesCompletas => write!(f, "Servicio de Unidades Completas"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    #[default]
    Activa,
    Cancelada,
}

/// One resolved line of a quotation. `precio_unitario` already includes the
/// assigned margin; the raw product price is not carried here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationLine {
    pub producto_id: String,
    pub nombre: String,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    pub tipo_variante: PriceBasis,
}

/// Creation payload submitted to the persistence API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationPayload {
    pub cliente_id: String,
    pub cliente_nombre: String,
    pub fecha: DateTime<Utc>,
    pub tipo_envio: ShippingVariant,
    pub costo_envio: Decimal,
    pub productos: Vec<QuotationLine>,
    pub total: Decimal,
}

/// A persisted quotation as returned by the API. Immutable after creation;
/// cancellation is the only state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: String,
    pub cliente_id: String,
    pub cliente_nombre: String,
    pub fecha: DateTime<Utc>,
    pub tipo_envio: ShippingVariant,
    pub costo_envio: Decimal,
    pub productos: Vec<QuotationLine>,
    pub total: Decimal,
    #[serde(default)]
    pub estado: QuotationStatus,
}

impl Quotation {
    pub fn is_cancelled(&self) -> bool {
        self.estado == QuotationStatus::Cancelada
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_variant_wire_names() {
        assert_eq!(
            serde_json::to_string(&ShippingVariant::Paqueteria).unwrap(),
            "\"Servicio de Paquetería\""
        );
        assert_eq!(
            serde_json::to_string(&ShippingVariant::UnidadesCompletas).unwrap(),
            "\"Servicio de Unidades Completas\""
        );
    }

    #[test]
    fn test_quotation_status_defaults_to_activa() {
        let raw = r#"{
            "id": "q1",
            "cliente_id": "c1",
            "cliente_nombre": "Constructora Lopez",
            "fecha": "2026-08-06T12:00:00Z",
            "tipo_envio": "Servicio de Paquetería",
            "costo_envio": 50.0,
            "productos": [],
            "total": 313.2
        }"#;
        let quotation: Quotation = serde_json::from_str(raw).expect("Failed to deserialize");
        assert_eq!(quotation.estado, QuotationStatus::Activa);
        assert!(!quotation.is_cancelled());
    }
}
