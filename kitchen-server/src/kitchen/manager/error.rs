use super::super::actions::TransitionError;
use super::super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::kitchen::KitchenOrderStatus;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Kitchen order not found: {0}")]
    OrderNotFound(i64),

    #[error("Cannot {action} order {order_id} in status {status}")]
    InvalidTransition {
        order_id: i64,
        status: KitchenOrderStatus,
        action: &'static str,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<TransitionError> for ManagerError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid {
                order_id,
                status,
                action,
            } => ManagerError::InvalidTransition {
                order_id,
                status,
                action,
            },
            e @ TransitionError::ZeroDuration { .. } => ManagerError::Validation(e.to_string()),
        }
    }
}

impl ManagerError {
    /// Infrastructure failure, the caller may retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ManagerError::Storage(_))
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) | StorageError::DuplicateId(_) = e {
        return ErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙，可重试
    ErrorCode::SystemBusy
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            ManagerError::OrderNotFound(id) => AppError::order_not_found(id),
            ManagerError::InvalidTransition {
                order_id,
                status,
                action,
            } => AppError::invalid_transition(order_id, status.as_str(), action),
            ManagerError::Validation(msg) => AppError::validation(msg),
        }
    }
}
