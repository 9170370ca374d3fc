//! 联系人 HTTP API 客户端

use crate::im::client::ClientConfig;
use crate::im::counterpart::models::Counterpart;
use crate::im::counterpart::types::{CompanyRecord, VendorRecord};
use crate::im::error::Result;
use crate::im::types::{extract_list, parse_list, read_json_body};
use tracing::{debug, info};
use uuid::Uuid;

pub const VENDOR_LIST_PATH: &str = "allvendor";
pub const COMPANY_LIST_PATH: &str = "getAllCompany";

/// 联系人相关的 HTTP API 客户端
pub struct CounterpartApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl CounterpartApi {
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    async fn get_list(&self, path: &str, operation_name: &str) -> Result<serde_json::Value> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.config.endpoint(path);

        info!("[ContactAPI] 📡 请求{}", operation_name);
        debug!("[ContactAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await?;
        read_json_body(response, operation_name).await
    }

    /// `GET /allvendor`
    pub async fn get_vendors(&self) -> Result<Vec<Counterpart>> {
        let value = self.get_list(VENDOR_LIST_PATH, "供应商列表").await?;
        let vendors: Vec<Counterpart> = parse_list::<VendorRecord>(extract_list(value), "供应商列表")
            .into_iter()
            .filter_map(VendorRecord::into_counterpart)
            .collect();
        info!("[ContactAPI] ✅ 供应商列表响应，条目数: {}", vendors.len());
        Ok(vendors)
    }

    /// `GET /getAllCompany`
    pub async fn get_companies(&self) -> Result<Vec<Counterpart>> {
        let value = self.get_list(COMPANY_LIST_PATH, "保险公司列表").await?;
        let companies: Vec<Counterpart> =
            parse_list::<CompanyRecord>(extract_list(value), "保险公司列表")
                .into_iter()
                .filter_map(CompanyRecord::into_counterpart)
                .collect();
        info!(
            "[ContactAPI] ✅ 保险公司列表响应，条目数: {}",
            companies.len()
        );
        Ok(companies)
    }
}
