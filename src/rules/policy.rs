//! 规则引擎使用的业务常量与可调整的策略

/// 提取步骤表示"没有数据"的哨兵值
pub const UNKNOWN: &str = "未知";

/// 聊天记录的图片类型标签，命中时使用专门的提示语
pub const CHAT_RECORD_TYPE: &str = "聊天记录";

/// 图片类型未识别时展示的名称
pub const UNRECOGNIZED_TYPE: &str = "无法识别的类型";

/// 聊天记录不足以单独证明在司
pub const CHAT_RECORD_POLICY: &str =
    "补打卡证明需提供有力清晰的在司真实证明，如 ①饭堂消费记录； ②电脑开机时间；③网页浏览或文件处理记录，当前是【聊天记录】";

/// 补打卡时视为"在司消费"凭证的图片类型关键字（小写）
pub const DEFAULT_IN_OFFICE_KEYWORDS: &[&str] = &[
    "账单",
    "消费",
    "饭堂",
    "食堂",
    "小票",
    "收银",
    "票据",
    "订单",
    "支付",
    "交易",
    "就餐",
    "餐饮",
    "餐费",
    "餐卡",
    "receipt",
    "consumption",
    "canteen",
    "cafeteria",
    "pos机",
    "checkout",
    "order",
    "payment",
    "transaction",
    "dining",
    "meal card",
];

/// 规则引擎策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePolicy {
    /// 补打卡类型纠偏的关键字（小写子串，大小写不敏感匹配）
    pub in_office_keywords: Vec<String>,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            in_office_keywords: DEFAULT_IN_OFFICE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl RulePolicy {
    /// 使用自定义关键字；传入空列表时保留内置列表
    pub fn with_keywords(keywords: Vec<String>) -> Self {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            Self::default()
        } else {
            Self {
                in_office_keywords: keywords,
            }
        }
    }

    /// 图片类型是否属于"在司消费"类凭证
    pub fn is_in_office_proof(&self, type_label: &str) -> bool {
        let lower = type_label.to_lowercase();
        self.in_office_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
    }
}
