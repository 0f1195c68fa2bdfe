use thiserror::Error;

use crate::frame_graph::pass::RgPassKind;
use crate::frame_graph::resource::RgResourceDimension;

/// FrameGraph 错误
///
/// 声明阶段的结构性错误（重名、多个深度附件等）在出错的调用处直接返回；
/// 跨 Pass 的一致性问题（先读后写、缺少 clear value）在 `build()` 时统一收集，
/// 不会中断构建。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RgError {
    #[error("resource \"{name}\" is already declared as {existing:?}, incompatible with {requested:?}")]
    DuplicateResource {
        name: String,
        existing: RgResourceDimension,
        requested: RgResourceDimension,
    },

    #[error("pass \"{name}\" is already declared in this frame")]
    DuplicatePassName { name: String },

    #[error("pass \"{pass}\" already has depth-stencil view \"{existing}\", rejected \"{rejected}\"")]
    DuplicateDepthStencil {
        pass: String,
        existing: String,
        rejected: String,
    },

    #[error("pass \"{pass}\" already declares a view of \"{resource}\"")]
    DuplicateView { pass: String, resource: String },

    #[error("{view} view of \"{resource}\" is not allowed on {kind:?} pass \"{pass}\": {reason}")]
    InvalidView {
        pass: String,
        kind: RgPassKind,
        resource: String,
        view: &'static str,
        reason: &'static str,
    },

    #[error("pass \"{pass}\" reads \"{resource}\" before any pass wrote it")]
    ReadBeforeWrite { resource: String, pass: String },

    #[error("pass \"{pass}\" clears \"{resource}\" but no clear value was supplied")]
    MissingClearValue { resource: String, pass: String },

    #[error("frame graph is already built, mutation rejected")]
    FrameAlreadyBuilt,

    #[error("pass handle {0} does not belong to this frame")]
    InvalidPassHandle(u32),

    #[error("resource \"{name}\" is not registered")]
    ResourceNotFound { name: String },
}

impl RgError {
    /// 是否为 `build()` 阶段收集的延迟诊断
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::ReadBeforeWrite { .. } | Self::MissingClearValue { .. })
    }
}

pub type RgResult<T> = Result<T, RgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RgError::DuplicatePassName { name: "Forward".to_string() };
        assert_eq!(err.to_string(), "pass \"Forward\" is already declared in this frame");

        let err = RgError::ReadBeforeWrite {
            resource: "missing".to_string(),
            pass: "P1".to_string(),
        };
        assert_eq!(err.to_string(), "pass \"P1\" reads \"missing\" before any pass wrote it");

        let err = RgError::InvalidView {
            pass: "Forward".to_string(),
            kind: RgPassKind::Raster,
            resource: "particles".to_string(),
            view: "raster",
            reason: "resource is a buffer",
        };
        assert_eq!(
            err.to_string(),
            "raster view of \"particles\" is not allowed on Raster pass \"Forward\": resource is a buffer"
        );
    }

    #[test]
    fn test_deferred_classification() {
        assert!(
            RgError::MissingClearValue {
                resource: "color".to_string(),
                pass: "P".to_string()
            }
            .is_deferred()
        );
        assert!(!RgError::FrameAlreadyBuilt.is_deferred());
    }
}
