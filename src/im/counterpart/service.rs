//! 联系人列表加载
//!
//! 两个列表相互独立：任何一个失败只记录日志并保持为空，不影响另一个。

use crate::im::backend::ChatBackend;
use crate::im::counterpart::models::{Counterpart, CounterpartDirectory};
use crate::im::error::Result;
use crate::im::profile::DirectoryScope;
use futures_util::future::join;
use std::sync::Arc;
use tracing::{error, info};

pub struct CounterpartLoader {
    backend: Arc<dyn ChatBackend>,
    scope: DirectoryScope,
}

impl CounterpartLoader {
    pub fn new(backend: Arc<dyn ChatBackend>, scope: DirectoryScope) -> Self {
        Self { backend, scope }
    }

    /// 并发拉取供应商和保险公司列表
    pub async fn load(&self) -> CounterpartDirectory {
        info!(
            "[Loader] 🔄 加载联系人列表 (供应商: {}, 保险公司: {})",
            self.scope.vendors, self.scope.companies
        );

        let vendors = async {
            if self.scope.vendors {
                Some(self.backend.list_vendors().await)
            } else {
                None
            }
        };
        let companies = async {
            if self.scope.companies {
                Some(self.backend.list_companies().await)
            } else {
                None
            }
        };
        let (vendors, companies) = join(vendors, companies).await;

        let directory = CounterpartDirectory {
            vendors: Self::settle(vendors, "供应商"),
            companies: Self::settle(companies, "保险公司"),
        };
        info!(
            "[Loader] ✅ 联系人列表加载完成 - 供应商: {}, 保险公司: {}",
            directory.vendors.len(),
            directory.companies.len()
        );
        directory
    }

    fn settle(result: Option<Result<Vec<Counterpart>>>, label: &str) -> Vec<Counterpart> {
        match result {
            None => Vec::new(),
            Some(Ok(list)) => list,
            Some(Err(e)) => {
                error!("[Loader] ❌ {}列表加载失败: {}", label, e);
                Vec::new()
            }
        }
    }
}
