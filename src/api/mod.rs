use crate::catalog::{Client, Product};
use crate::configuration::ApiConfig;
use crate::orders::{OrderPayload, OrderStatus, SalesOrder};
use crate::quotation::{Quotation, QuotationPayload};
use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request error: {0}")]
    Network(String),

    #[error("Token rejected by the API")]
    Unauthorized,

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Bearer token handed explicitly to every collaborator call; the client
/// never reads ambient process state on its own.
#[derive(Debug, Clone)]
pub struct AuthContext {
    token: String,
}

impl AuthContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        env::var("API_TOKEN").ok().map(Self::new)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// The persistence collaborator the quoting flow talks to. Concrete
/// transport lives in `ApiClient`; services hold the trait so the boundary
/// stays swappable.
#[async_trait]
pub trait SalesApi: Send + Sync {
    async fn list_clients(&self, auth: &AuthContext) -> Result<Vec<Client>, ApiError>;
    async fn list_products(&self, auth: &AuthContext) -> Result<Vec<Product>, ApiError>;
    async fn get_product(&self, auth: &AuthContext, id: &str) -> Result<Product, ApiError>;
    async fn create_quotation(
        &self,
        auth: &AuthContext,
        payload: &QuotationPayload,
    ) -> Result<Quotation, ApiError>;
    async fn cancel_quotation(&self, auth: &AuthContext, id: &str) -> Result<(), ApiError>;
    async fn create_order(
        &self,
        auth: &AuthContext,
        payload: &OrderPayload,
    ) -> Result<SalesOrder, ApiError>;
    async fn update_order(
        &self,
        auth: &AuthContext,
        id: &str,
        estado: OrderStatus,
        comentarios: &str,
    ) -> Result<SalesOrder, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    // resolved products are reused for display-name lookups for a short while
    product_cache: Cache<String, Product>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            product_cache: Cache::builder()
                .max_capacity(512)
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    /// Exchanges operator credentials for a bearer token.
    pub async fn login(&self, usuario: &str, password: &str) -> Result<AuthContext, ApiError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "usuario": usuario, "password": password }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = Self::check(response).await?;

        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(AuthContext::new(login.token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, "API request failed: {}", body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .header("Authorization", auth.bearer())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SalesApi for ApiClient {
    async fn list_clients(&self, auth: &AuthContext) -> Result<Vec<Client>, ApiError> {
        self.get_json(auth, "/clientes").await
    }

    async fn list_products(&self, auth: &AuthContext) -> Result<Vec<Product>, ApiError> {
        self.get_json(auth, "/productos").await
    }

    async fn get_product(&self, auth: &AuthContext, id: &str) -> Result<Product, ApiError> {
        if let Some(product) = self.product_cache.get(id) {
            return Ok(product);
        }
        let path = format!("/productos/{}", urlencoding::encode(id));
        let product: Product = self.get_json(auth, &path).await?;
        self.product_cache.insert(id.to_string(), product.clone());
        Ok(product)
    }

    async fn create_quotation(
        &self,
        auth: &AuthContext,
        payload: &QuotationPayload,
    ) -> Result<Quotation, ApiError> {
        let response = self
            .http
            .post(self.url("/cotizaciones"))
            .header("Authorization", auth.bearer())
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn cancel_quotation(&self, auth: &AuthContext, id: &str) -> Result<(), ApiError> {
        let path = format!("/cotizaciones/{}", urlencoding::encode(id));
        let response = self
            .http
            .patch(self.url(&path))
            .header("Authorization", auth.bearer())
            .json(&json!({ "estado": "cancelada" }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_order(
        &self,
        auth: &AuthContext,
        payload: &OrderPayload,
    ) -> Result<SalesOrder, ApiError> {
        let response = self
            .http
            .post(self.url("/ordenes-venta"))
            .header("Authorization", auth.bearer())
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn update_order(
        &self,
        auth: &AuthContext,
        id: &str,
        estado: OrderStatus,
        comentarios: &str,
    ) -> Result<SalesOrder, ApiError> {
        let path = format!("/ordenes-venta/{}", urlencoding::encode(id));
        let response = self
            .http
            .patch(self.url(&path))
            .header("Authorization", auth.bearer())
            .json(&json!({ "estado": estado, "comentarios": comentarios }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PriceBasis;
    use crate::orders::OrderService;
    use crate::pricing::PricedLine;
    use crate::quotation::{
        QuotationLine, QuotationService, QuotationStatus, ShippingVariant, ValidationError,
        QuotationError,
    };
    use chrono::Utc;
    use mockito::Matcher;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn client_for(server: &mockito::Server) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: server.url(),
        })
    }

    fn auth() -> AuthContext {
        AuthContext::new("token-1")
    }

    fn quotation_body(id: &str, estado: &str) -> String {
        json!({
            "id": id,
            "cliente_id": "c1",
            "cliente_nombre": "Constructora Lopez",
            "fecha": "2026-08-06T12:00:00Z",
            "tipo_envio": "Servicio de Paquetería",
            "costo_envio": 50.0,
            "productos": [{
                "producto_id": "p1",
                "nombre": "Piso ceramico 60x60",
                "cantidad": 2.0,
                "precio_unitario": 110.0,
                "tipo_variante": "pieza"
            }],
            "total": 313.2,
            "estado": estado
        })
        .to_string()
    }

    fn order_body(id: &str, estado: &str) -> String {
        json!({
            "id": id,
            "cotizacion_id": "q1",
            "cliente_id": "c1",
            "cliente_nombre": "Constructora Lopez",
            "fecha": "2026-08-06T12:00:00Z",
            "productos": [],
            "total": 313.2,
            "estado": estado,
            "comentarios": "urgente"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_list_products_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/productos")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": "p1",
                    "nombre": "Piso ceramico 60x60",
                    "codigo": "PC-6060",
                    "formato": "60x60",
                    "precio_pieza": 100.0,
                    "precio_caja": null,
                    "precio_m2": 180.0,
                    "precio_pieza_iva": 116.0,
                    "precio_caja_iva": null,
                    "precio_m2_iva": null
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let api = client_for(&server);
        let products = api.list_products(&auth()).await.expect("Request failed");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price_for(PriceBasis::Pieza), Some(dec("100")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_distinguished_from_other_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/clientes")
            .with_status(401)
            .create_async()
            .await;

        let api = client_for(&server);
        let err = api.list_clients(&auth()).await.expect_err("Expected failure");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/clientes")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let api = client_for(&server);
        let err = api.list_clients(&auth()).await.expect_err("Expected failure");
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_product_serves_repeats_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/productos/p1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "p1",
                    "nombre": "Piso ceramico 60x60",
                    "codigo": null,
                    "formato": null,
                    "precio_pieza": 100.0,
                    "precio_caja": null,
                    "precio_m2": null,
                    "precio_pieza_iva": null,
                    "precio_caja_iva": null,
                    "precio_m2_iva": null
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let api = client_for(&server);
        let first = api.get_product(&auth(), "p1").await.expect("Request failed");
        let second = api.get_product(&auth(), "p1").await.expect("Request failed");
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_exchanges_credentials_for_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login")
            .match_body(Matcher::PartialJson(json!({ "usuario": "ventas" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "token": "token-9" }).to_string())
            .create_async()
            .await;

        let api = client_for(&server);
        let auth = api.login("ventas", "secreto").await.expect("Login failed");
        assert_eq!(auth.bearer(), "Bearer token-9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_posts_payload_and_returns_quotation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cotizaciones")
            .match_header("authorization", "Bearer token-1")
            .match_body(Matcher::PartialJson(json!({
                "cliente_id": "c1",
                "tipo_envio": "Servicio de Paquetería",
                "costo_envio": 50.0,
                "total": 313.2
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(quotation_body("q1", "activa"))
            .create_async()
            .await;

        let service = QuotationService::new(Arc::new(client_for(&server)));
        let lines = vec![PricedLine {
            product: crate::catalog::Product::new("p1", "Piso ceramico 60x60")
                .with_precio_pieza(dec("100")),
            cantidad: dec("2"),
            tipo_precio: Some(PriceBasis::Pieza),
            precio_base: Some(dec("100")),
            ganancia: dec("10"),
        }];
        let mut cliente = crate::catalog::Client::new("c1", "Constructora Lopez");
        cliente.descuento = Some(dec("10"));

        let quotation = service
            .submit(
                &auth(),
                Some(&cliente),
                &lines,
                ShippingVariant::Paqueteria,
                dec("50"),
            )
            .await
            .expect("Submit failed");
        assert_eq!(quotation.id, "q1");
        assert_eq!(quotation.estado, QuotationStatus::Activa);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_validation_failure_issues_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cotizaciones")
            .expect(0)
            .create_async()
            .await;

        let service = QuotationService::new(Arc::new(client_for(&server)));
        let err = service
            .submit(&auth(), None, &[], ShippingVariant::Paqueteria, dec("50"))
            .await
            .expect_err("Expected validation failure");
        assert!(matches!(
            err,
            QuotationError::Validation(ValidationError::MissingClient)
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancel_already_cancelled_is_a_local_noop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/cotizaciones/q1")
            .expect(0)
            .create_async()
            .await;

        let service = QuotationService::new(Arc::new(client_for(&server)));
        let cancelled: Quotation =
            serde_json::from_str(&quotation_body("q1", "cancelada")).unwrap();
        let result = service.cancel(&auth(), &cancelled).await.expect("Cancel failed");
        assert!(result.is_cancelled());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancel_patches_active_quotation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/cotizaciones/q1")
            .match_body(Matcher::PartialJson(json!({ "estado": "cancelada" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(quotation_body("q1", "cancelada"))
            .create_async()
            .await;

        let service = QuotationService::new(Arc::new(client_for(&server)));
        let active: Quotation = serde_json::from_str(&quotation_body("q1", "activa")).unwrap();
        let result = service.cancel(&auth(), &active).await.expect("Cancel failed");
        assert!(result.is_cancelled());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_convert_posts_order_and_tracks_status() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/ordenes-venta")
            .match_body(Matcher::PartialJson(json!({
                "cotizacion_id": "q1",
                "estado": "surtiendo",
                "comentarios": "urgente"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(order_body("o1", "surtiendo"))
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/ordenes-venta/o1")
            .match_body(Matcher::PartialJson(json!({
                "estado": "en_entrega",
                "comentarios": "salio a ruta"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(order_body("o1", "en_entrega"))
            .create_async()
            .await;

        let service = OrderService::new(Arc::new(client_for(&server)));
        let source: Quotation = serde_json::from_str(&quotation_body("q1", "activa")).unwrap();
        let order = service
            .convert(&auth(), &source, crate::orders::OrderStatus::Surtiendo, "urgente")
            .await
            .expect("Convert failed");
        assert_eq!(order.estado, crate::orders::OrderStatus::Surtiendo);

        let updated = service
            .set_status(
                &auth(),
                &order,
                crate::orders::OrderStatus::EnEntrega,
                "salio a ruta",
            )
            .await
            .expect("Update failed");
        assert_eq!(updated.estado, crate::orders::OrderStatus::EnEntrega);
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_convert_cancelled_quotation_issues_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ordenes-venta")
            .expect(0)
            .create_async()
            .await;

        let service = OrderService::new(Arc::new(client_for(&server)));
        let cancelled: Quotation =
            serde_json::from_str(&quotation_body("q1", "cancelada")).unwrap();
        let err = service
            .convert(&auth(), &cancelled, crate::orders::OrderStatus::Surtiendo, "")
            .await
            .expect_err("Expected conversion failure");
        assert!(matches!(
            err,
            crate::orders::OrderError::Conversion(
                crate::orders::ConversionError::QuotationCancelled
            )
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_round_trip_quotation_line_triples() {
        let line = QuotationLine {
            producto_id: "p1".to_string(),
            nombre: "Piso ceramico 60x60".to_string(),
            cantidad: dec("2"),
            precio_unitario: dec("110"),
            tipo_variante: PriceBasis::Pieza,
        };
        let payload = QuotationPayload {
            cliente_id: "c1".to_string(),
            cliente_nombre: "Constructora Lopez".to_string(),
            fecha: Utc::now(),
            tipo_envio: ShippingVariant::Paqueteria,
            costo_envio: dec("50"),
            productos: vec![line.clone()],
            total: dec("313.2"),
        };
        let serialized = serde_json::to_string(&payload).unwrap();
        let parsed: QuotationPayload = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.productos[0].producto_id, line.producto_id);
        assert_eq!(parsed.productos[0].cantidad, line.cantidad);
        assert_eq!(parsed.productos[0].tipo_variante, line.tipo_variante);
    }
}
