//! 单张证明图片的提取结果
//!
//! LLM 返回的 JSON 并不总是守规矩：布尔值可能是字符串，候选时间可能只给一个字符串，
//! 内容可能包在 ```json 代码块里。`RawExtraction` 负责在边界上宽松地接住这些内容，
//! 规则引擎只看到类型严格的 `ExtractionResult`。

use serde::{Deserialize, Serialize};

use crate::rules::policy::UNKNOWN;

/// 候选时间最多保留的数量
pub const MAX_CANDIDATE_TIMES: usize = 5;

/// 从证明图片中提取的结构化数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    /// 图片中的患者/当事人姓名
    pub extracted_name: Option<String>,
    /// 图片日期 (yyyy-MM-dd)
    pub request_date: Option<String>,
    /// 图片时间
    pub request_time: Option<String>,
    /// 图片类型（病历单、聊天记录、饭堂消费记录……）
    pub request_type: Option<String>,
    /// 模型自评：是否为该申请类型的有效证据
    pub is_proof_type_valid: bool,
    /// 关键文字摘要
    pub content: String,
    /// 是否为公司内部场景
    pub is_company_internal: bool,
    /// 是否为聊天记录
    pub is_chat_record: bool,
    /// 从聊天内容中提取的时间
    pub time_from_content: Option<String>,
    /// 候选时间（已由提取步骤按打卡方向筛选，最多 5 个）
    pub candidate_times: Vec<String>,
}

impl ExtractionResult {
    /// 解析 LLM 返回的文本内容
    pub fn from_llm_content(content: &str) -> Result<Self, serde_json::Error> {
        let json = strip_code_fence(content);
        let raw: RawExtraction = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    /// 图片类型（未识别时为 None）
    pub fn type_label(&self) -> Option<&str> {
        self.request_type.as_deref()
    }
}

/// 去掉 ```json 代码块标记，并截取第一个 `{` 到最后一个 `}` 之间的内容
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed).trim();

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// LLM 原始返回结构（宽松解析）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    #[serde(deserialize_with = "deserialize_text")]
    extracted_name: String,
    #[serde(deserialize_with = "deserialize_text")]
    request_date: String,
    #[serde(deserialize_with = "deserialize_text")]
    request_time: String,
    #[serde(deserialize_with = "deserialize_text")]
    request_type: String,
    #[serde(deserialize_with = "deserialize_lenient_bool")]
    is_proof_type_valid: bool,
    #[serde(deserialize_with = "deserialize_text")]
    content: String,
    #[serde(deserialize_with = "deserialize_lenient_bool")]
    is_company_internal: bool,
    #[serde(deserialize_with = "deserialize_lenient_bool")]
    is_chat_record: bool,
    #[serde(deserialize_with = "deserialize_text")]
    time_from_content: String,
    #[serde(deserialize_with = "deserialize_string_list")]
    candidate_times: Vec<String>,
}

impl From<RawExtraction> for ExtractionResult {
    fn from(raw: RawExtraction) -> Self {
        Self {
            extracted_name: known(raw.extracted_name),
            request_date: known(raw.request_date),
            request_time: known(raw.request_time),
            request_type: known(raw.request_type),
            is_proof_type_valid: raw.is_proof_type_valid,
            content: raw.content.trim().to_string(),
            is_company_internal: raw.is_company_internal,
            is_chat_record: raw.is_chat_record,
            time_from_content: known(raw.time_from_content),
            candidate_times: raw
                .candidate_times
                .into_iter()
                .filter_map(known)
                .take(MAX_CANDIDATE_TIMES)
                .collect(),
        }
    }
}

/// "未知" 与空字符串都视为没有数据
fn known(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == UNKNOWN {
        None
    } else {
        Some(value.to_string())
    }
}

// 字符串字段：接受字符串、数字、null
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

// 布尔字段：接受 true/false、"true"/"false"/"是"/"否"、0/1、null
fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct BoolVisitor;

    impl<'de> Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean, a boolean-like string or 0/1")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            match value.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "是" => Ok(true),
                "false" | "no" | "0" | "否" | "" => Ok(false),
                other => Err(E::custom(format!("无法识别的布尔值: {}", other))),
            }
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value != 0)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value != 0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(false)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(false)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

// 列表字段：接受字符串数组、单个字符串（逗号分隔）、null
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a list of strings or a comma separated string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value
                .split([',', '，', '、'])
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(item) = seq.next_element::<serde_json::Value>()? {
                match item {
                    serde_json::Value::String(s) => out.push(s),
                    serde_json::Value::Null => {}
                    other => out.push(other.to_string()),
                }
            }
            Ok(out)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_content() {
        let content = r#"```json
{"extracted_name":"张三","request_date":"2025-10-21","request_time":"09:05","request_type":"病历单","is_proof_type_valid":true,"content":"急性肠胃炎","is_company_internal":false,"is_chat_record":false,"time_from_content":"","candidate_times":[]}
```"#;
        let data = ExtractionResult::from_llm_content(content).unwrap();
        assert_eq!(data.extracted_name.as_deref(), Some("张三"));
        assert_eq!(data.request_date.as_deref(), Some("2025-10-21"));
        assert_eq!(data.type_label(), Some("病历单"));
        assert!(data.is_proof_type_valid);
        assert_eq!(data.time_from_content, None);
    }

    #[test]
    fn test_unknown_sentinel_becomes_none() {
        let content = r#"{"extracted_name":"未知","request_date":"未知","request_type":" "}"#;
        let data = ExtractionResult::from_llm_content(content).unwrap();
        assert_eq!(data.extracted_name, None);
        assert_eq!(data.request_date, None);
        assert_eq!(data.request_type, None);
        assert!(!data.is_proof_type_valid);
    }

    #[test]
    fn test_lenient_fields() {
        let content = r#"以下是结果：{"is_proof_type_valid":"true","is_chat_record":1,"candidate_times":"08:50, 08:55","request_date":20251021} 完毕"#;
        let data = ExtractionResult::from_llm_content(content).unwrap();
        assert!(data.is_proof_type_valid);
        assert!(data.is_chat_record);
        assert_eq!(data.candidate_times, vec!["08:50", "08:55"]);
        assert_eq!(data.request_date.as_deref(), Some("20251021"));
    }

    #[test]
    fn test_candidate_times_are_capped() {
        let content = r#"{"candidate_times":["08:01","08:02","未知","08:03","08:04","08:05","08:06",null]}"#;
        let data = ExtractionResult::from_llm_content(content).unwrap();
        assert_eq!(
            data.candidate_times,
            vec!["08:01", "08:02", "08:03", "08:04", "08:05"]
        );
    }

    #[test]
    fn test_malformed_content_is_error() {
        assert!(ExtractionResult::from_llm_content("抱歉，我无法识别这张图片").is_err());
        assert!(ExtractionResult::from_llm_content(r#"{"is_chat_record":"maybe"}"#).is_err());
    }
}
