use crate::catalog::Product;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub cantidad: Decimal,
    // live text behind the quantity field, committed on blur
    entrada: String,
}

impl CartLine {
    fn new(product: Product) -> Self {
        Self {
            product,
            cantidad: Decimal::ONE,
            entrada: "1".to_string(),
        }
    }

    pub fn quantity_input(&self) -> &str {
        &self.entrada
    }
}

/// The in-progress sale. Lines merge by product id; the cart id correlates
/// a submission attempt so the caller can keep at most one in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    lines: Vec<CartLine>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            lines: Vec::new(),
        }
    }

    /// Adds a product, incrementing the quantity by one when the product is
    /// already in the cart.
    pub fn add(&mut self, product: Product) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            line.cantidad += Decimal::ONE;
            line.entrada = line.cantidad.to_string();
        } else {
            self.lines.push(CartLine::new(product));
        }
    }

    /// Keystroke-level edit of a line's quantity field. Input that is not an
    /// in-progress decimal (digits with at most one dot, or empty) is
    /// rejected without touching the line. Returns whether the edit stuck.
    pub fn edit_quantity(&mut self, product_id: &str, raw: &str) -> bool {
        if !is_quantity_input(raw) {
            return false;
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.entrada = raw.to_string();
                true
            }
            None => false,
        }
    }

    /// Finalizes a quantity edit. Anything that does not parse to a finite
    /// positive number resets the line to 1; valid input is rounded to two
    /// decimal places.
    pub fn commit_quantity(&mut self, product_id: &str, raw: &str) {
        if let Some(line) = self.line_mut(product_id) {
            let parsed = raw.trim().parse::<f64>().ok().and_then(Decimal::from_f64);
            line.cantidad = match parsed {
                Some(cantidad) if cantidad > Decimal::ZERO => cantidad.round_dp(2),
                _ => Decimal::ONE,
            };
            line.entrada = line.cantidad.to_string();
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product.id == product_id)
    }
}

fn is_quantity_input(raw: &str) -> bool {
    raw.matches('.').count() <= 1 && raw.chars().all(|c| c.is_ascii_digit() || c == '.')
}
