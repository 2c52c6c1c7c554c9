//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive)
//! - walker_speed_min <= walker_speed_max
//! - barrier 初始退避不超过最大退避，最大退避不超过超时

use contracts::{ContractError, ProviderConfig};
use validator::{Validate, ValidationErrors};

/// 校验 ProviderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ProviderConfig) -> Result<(), ContractError> {
    config.validate().map_err(field_error)?;
    validate_walker_speed(config)?;
    validate_barrier(config)?;
    Ok(())
}

/// 将 validator 的错误转为第一个字段错误
fn field_error(errors: ValidationErrors) -> ContractError {
    let field = first_failing_path(&errors).unwrap_or_else(|| "config".to_string());
    ContractError::config_validation(field, errors.to_string())
}

fn first_failing_path(errors: &ValidationErrors) -> Option<String> {
    use validator::ValidationErrorsKind;

    let mut keys: Vec<_> = errors.errors().iter().collect();
    keys.sort_by(|a, b| a.0.cmp(b.0));
    let (name, kind) = keys.into_iter().next()?;
    match kind {
        ValidationErrorsKind::Struct(inner) => first_failing_path(inner)
            .map(|rest| format!("{name}.{rest}"))
            .or_else(|| Some(name.to_string())),
        _ => Some(name.to_string()),
    }
}

fn validate_walker_speed(config: &ProviderConfig) -> Result<(), ContractError> {
    let spawn = &config.spawn;
    if spawn.walker_speed_min > spawn.walker_speed_max {
        return Err(ContractError::config_validation(
            "spawn.walker_speed_min / spawn.walker_speed_max",
            format!(
                "walker_speed_min ({}) must be <= walker_speed_max ({})",
                spawn.walker_speed_min, spawn.walker_speed_max
            ),
        ));
    }
    Ok(())
}

fn validate_barrier(config: &ProviderConfig) -> Result<(), ContractError> {
    let barrier = &config.barrier;
    if barrier.initial_backoff() > barrier.max_backoff() {
        return Err(ContractError::config_validation(
            "barrier.initial_backoff_us",
            format!(
                "initial backoff ({}us) exceeds max backoff ({}ms)",
                barrier.initial_backoff_us, barrier.max_backoff_ms
            ),
        ));
    }
    if barrier.max_backoff() > barrier.timeout() {
        return Err(ContractError::config_validation(
            "barrier.max_backoff_ms",
            format!(
                "max backoff ({}ms) exceeds timeout ({}ms)",
                barrier.max_backoff_ms, barrier.timeout_ms
            ),
        ));
    }
    Ok(())
}
