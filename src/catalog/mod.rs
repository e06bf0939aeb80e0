use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The unit of sale a price applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBasis {
    Pieza,
    Caja,
    M2,
}

impl fmt::Display for PriceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pieza => write!(f, "pieza"),
            Self::Caja => write!(f, "caja"),
            Self::M2 => write!(f, "m2"),
        }
    }
}

/// A catalog product as served by the API. Prices are optional per basis;
/// the `_iva` fields carry the VAT-inclusive counterparts when the backend
/// provides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub nombre: String,
    pub codigo: Option<String>,
    pub formato: Option<String>,
    pub precio_pieza: Option<Decimal>,
    pub precio_caja: Option<Decimal>,
    pub precio_m2: Option<Decimal>,
    pub precio_pieza_iva: Option<Decimal>,
    pub precio_caja_iva: Option<Decimal>,
    pub precio_m2_iva: Option<Decimal>,
}

impl Product {
    pub fn new(id: impl Into<String>, nombre: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nombre: nombre.into(),
            codigo: None,
            formato: None,
            precio_pieza: None,
            precio_caja: None,
            precio_m2: None,
            precio_pieza_iva: None,
            precio_caja_iva: None,
            precio_m2_iva: None,
        }
    }

    pub fn with_precio_pieza(mut self, precio: Decimal) -> Self {
        self.precio_pieza = Some(precio);
        self
    }

    pub fn with_precio_caja(mut self, precio: Decimal) -> Self {
        self.precio_caja = Some(precio);
        self
    }

    pub fn with_precio_m2(mut self, precio: Decimal) -> Self {
        self.precio_m2 = Some(precio);
        self
    }

    /// VAT-exclusive price for the given basis, if the product carries one.
    pub fn price_for(&self, basis: PriceBasis) -> Option<Decimal> {
        match basis {
            PriceBasis::Pieza => self.precio_pieza,
            PriceBasis::Caja => self.precio_caja,
            PriceBasis::M2 => self.precio_m2,
        }
    }

    // pieza is preferred, then caja, then m2
    pub fn default_basis(&self) -> Option<PriceBasis> {
        if self.precio_pieza.is_some() {
            return Some(PriceBasis::Pieza);
        }
        if self.precio_caja.is_some() {
            return Some(PriceBasis::Caja);
        }
        if self.precio_m2.is_some() {
            return Some(PriceBasis::M2);
        }
        None
    }

    pub fn has_price(&self) -> bool {
        self.default_basis().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub nombre: String,
    pub descripcion: Option<String>,
}

/// A client record. `descuento` is the percentage applied as the default
/// profit margin when the client is selected during quoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub nombre: String,
    pub direccion: Option<String>,
    pub descuento: Option<Decimal>,
    #[serde(default)]
    pub proyectos: Vec<Project>,
}

impl Client {
    pub fn new(id: impl Into<String>, nombre: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nombre: nombre.into(),
            direccion: None,
            descuento: None,
            proyectos: Vec::new(),
        }
    }

    pub fn default_margin(&self) -> Decimal {
        self.descuento.unwrap_or(Decimal::ZERO)
    }
}
