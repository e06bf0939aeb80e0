use crate::cart::{Cart, CartLine};
use crate::catalog::{Client, PriceBasis, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// fixed at 16%, not configurable
pub fn vat_rate() -> Decimal {
    Decimal::new(16, 2)
}

/// A cart line carried through the margin step: chosen price basis, the
/// VAT-exclusive unit price resolved for it, and the profit percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product: Product,
    pub cantidad: Decimal,
    pub tipo_precio: Option<PriceBasis>,
    pub precio_base: Option<Decimal>,
    pub ganancia: Decimal,
}

impl PricedLine {
    /// Seeds pricing state from a cart line using the product's default
    /// basis. Products without any price start out unpriced and must be
    /// resolved before the quotation can be built.
    pub fn from_cart_line(line: &CartLine) -> Self {
        let tipo_precio = line.product.default_basis();
        let precio_base = tipo_precio.and_then(|b| line.product.price_for(b));
        Self {
            product: line.product.clone(),
            cantidad: line.cantidad,
            tipo_precio,
            precio_base,
            ganancia: Decimal::ZERO,
        }
    }

    /// Switches the line to the requested basis. When the product does not
    /// offer that basis the default inference applies instead.
    pub fn select_basis(&mut self, basis: PriceBasis) {
        match self.product.price_for(basis) {
            Some(precio) => {
                self.tipo_precio = Some(basis);
                self.precio_base = Some(precio);
            }
            None => {
                self.tipo_precio = self.product.default_basis();
                self.precio_base = self.tipo_precio.and_then(|b| self.product.price_for(b));
            }
        }
    }

    /// Overwrites the profit margin. Negative input clamps to zero.
    pub fn set_margin(&mut self, percent: Decimal) {
        self.ganancia = percent.max(Decimal::ZERO);
    }

    /// Margin as typed by the operator; unparseable text coerces to 0.
    pub fn set_margin_input(&mut self, raw: &str) {
        let percent = raw.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO);
        self.set_margin(percent);
    }

    /// Margin-inclusive unit price; None until a basis is resolved.
    pub fn unit_price(&self) -> Option<Decimal> {
        self.precio_base
            .map(|base| base * (Decimal::ONE + self.ganancia / Decimal::ONE_HUNDRED))
    }

    /// Line total; unpriced lines contribute nothing.
    pub fn total(&self) -> Decimal {
        self.unit_price()
            .map(|precio| precio * self.cantidad)
            .unwrap_or(Decimal::ZERO)
    }

    fn margin_amount(&self) -> Decimal {
        match self.precio_base {
            Some(base) => base * self.ganancia / Decimal::ONE_HUNDRED * self.cantidad,
            None => Decimal::ZERO,
        }
    }
}

pub fn price_cart(cart: &Cart) -> Vec<PricedLine> {
    cart.lines().iter().map(PricedLine::from_cart_line).collect()
}

/// Overwrites every line's margin with the selected client's percentage.
/// Invoked once when a client is picked for the sale.
pub fn apply_client_default_margin(lines: &mut [PricedLine], client: &Client) {
    for line in lines.iter_mut() {
        line.set_margin(client.default_margin());
    }
}

pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::total).sum()
}

pub fn margin_total(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::margin_amount).sum()
}

/// Running totals for the quote screen. All values are exact decimals;
/// rounding happens only when the payload is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub ganancia: Decimal,
    pub costo_envio: Decimal,
    pub subtotal_con_envio: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
}

impl QuoteTotals {
    /// Negative shipping input is treated as zero.
    pub fn compute(lines: &[PricedLine], costo_envio: Decimal) -> Self {
        let costo_envio = costo_envio.max(Decimal::ZERO);
        let subtotal = subtotal(lines);
        let subtotal_con_envio = subtotal + costo_envio;
        let iva = subtotal_con_envio * vat_rate();
        Self {
            subtotal,
            ganancia: margin_total(lines),
            costo_envio,
            subtotal_con_envio,
            iva,
            total: subtotal_con_envio + iva,
        }
    }
}
