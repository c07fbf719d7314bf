//! 逐项操作结果。
//!
//! 读、写、历史三类原生结果都实现 [`Outcome`]，统一归一化为
//! [`OperationOutcome`]（条目名、是否成功、结果码字符串）。

use crate::data::DataPoint;
use serde::Serialize;
use std::fmt;

/// 原生逐项结果码。只有 `S_OK` 视为成功。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultId {
    Ok,
    Clamp,
    NoData,
    MoreData,
    Fail,
    OutOfMemory,
    InvalidArgument,
    InvalidItemName,
    UnknownItemName,
    InvalidHandle,
    BadType,
    ReadOnly,
    WriteOnly,
    TimedOut,
    BadRights,
    Other(String),
}

impl ResultId {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResultId::Ok)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultId::Ok => "S_OK",
            ResultId::Clamp => "S_CLAMP",
            ResultId::NoData => "S_NODATA",
            ResultId::MoreData => "S_MOREDATA",
            ResultId::Fail => "E_FAIL",
            ResultId::OutOfMemory => "E_OUTOFMEMORY",
            ResultId::InvalidArgument => "E_INVALIDARG",
            ResultId::InvalidItemName => "E_INVALID_ITEM_NAME",
            ResultId::UnknownItemName => "E_UNKNOWN_ITEM_NAME",
            ResultId::InvalidHandle => "E_INVALIDHANDLE",
            ResultId::BadType => "E_BADTYPE",
            ResultId::ReadOnly => "E_READONLY",
            ResultId::WriteOnly => "E_WRITEONLY",
            ResultId::TimedOut => "E_TIMEDOUT",
            ResultId::BadRights => "E_BADRIGHTS",
            ResultId::Other(code) => code,
        }
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 统一的逐项操作结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub item_name: String,
    pub success: bool,
    pub result_code: String,
}

/// 可归一化为 [`OperationOutcome`] 的原生结果。
pub trait Outcome {
    fn item_name(&self) -> &str;

    fn result_id(&self) -> &ResultId;

    fn is_success(&self) -> bool {
        self.result_id().is_ok()
    }

    fn outcome(&self) -> OperationOutcome {
        OperationOutcome {
            item_name: self.item_name().to_string(),
            success: self.is_success(),
            result_code: self.result_id().to_string(),
        }
    }
}

/// 一次读取的单项结果：样本 + 结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadResult {
    pub point: DataPoint,
    pub outcome: OperationOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Native {
        name: String,
        id: ResultId,
    }

    impl Outcome for Native {
        fn item_name(&self) -> &str {
            &self.name
        }

        fn result_id(&self) -> &ResultId {
            &self.id
        }
    }

    #[test]
    fn only_s_ok_is_success() {
        let ok = Native {
            name: "Random.Int1".to_string(),
            id: ResultId::Ok,
        };
        let clamp = Native {
            name: "Random.Int2".to_string(),
            id: ResultId::Clamp,
        };
        assert_eq!(
            ok.outcome(),
            OperationOutcome {
                item_name: "Random.Int1".to_string(),
                success: true,
                result_code: "S_OK".to_string(),
            }
        );
        let clamp = clamp.outcome();
        assert!(!clamp.success);
        assert_eq!(clamp.result_code, "S_CLAMP");
    }

    #[test]
    fn unknown_codes_render_verbatim() {
        assert_eq!(ResultId::Other("0xC0040007".to_string()).to_string(), "0xC0040007");
    }
}
