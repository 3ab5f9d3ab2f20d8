//! Runtime task configuration and its deduplication.

use crate::types::{PatternSet, SourceDescriptor, Sub};
use serde_json::{Map, Value};
use tracing::error;

/// Default node renaming template.
pub const DEFAULT_RENAME: &str = "{flag}-{country}-{type}-{index}";

/// Node names dropped by default: notices, ads and traffic/expiry markers.
pub const DEFAULT_EXCLUDE: &str = concat!(
    r"(?i)(到期|流量|Expire|Traffic|时间|官网|引导页?|",
    r"网(\s+)?址|官址|地址|导航|平台|网站|域名|付费|优惠|折扣|刷新|",
    r"获取|订阅|群|取消|禁|产品|余额|更新|回国|telegram|t.me|",
    r"频道|电报|售后|反馈|工单|私聊|维护|升级|邮箱|关闭|耗尽|关机|停机|",
    r"故障|宕机|调整|修复|解决|重新|拥挤|测试|公测|过年|test|测速|",
    r"https?://|重置|剩余|特殊|⭕|1️⃣|购买|暂时|临时|下载|调试|",
    r"检查|干扰|热度|公告|官方|推迟|阻断|采购|好用|福利|精品|商用|",
    r"Prepaid|疫情|感染|下架|投诉|屏蔽|邀请|欢迎|机场|返利|推广|",
    r"佣金|广告|破解|不同|骗|店|YYDS|真香|关注|谢谢|大家|永久|浏览器|",
    r"月付|打开|包月|套餐|以上|以下|通知|注册|活动|转换|保证|每天|分享|",
    r"倒卖|搬运|苏小柠|王者荣耀|代练|去除|不合适|尽快|绑定|临时域名|禁止|",
    r"登录|激活|账号|恢复|更换|搜索|失联|发布)",
);

/// Node names kept by default.
pub const DEFAULT_INCLUDE: &str = r"(?i)(日本|香港|台湾|新加坡|美国|英国|gpt|chatgpt|解锁|x|奈飞|netflix)";

/// Default subscription API prefix.
pub const DEFAULT_API_PREFIX: &str = "/api/v1/";

/// One fetch task handed to the fetch collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskConfig {
    pub name: String,

    /// Converter binary used by the fetch collaborator.
    pub bin_name: String,

    pub taskid: i64,

    pub domain: String,

    pub sub: String,

    pub index: u32,

    /// Retries for failed requests.
    pub retry: u32,

    /// Highest allowed traffic multiplier.
    pub rate: f64,

    pub tag: String,

    pub renew: Option<Map<String, Value>>,

    pub coupon: String,

    pub rename: String,

    pub exclude: PatternSet,

    pub include: PatternSet,

    /// Whether nodes from this task go through the liveness prober.
    pub liveness: bool,

    pub invite_code: String,

    pub api_prefix: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            bin_name: String::new(),
            taskid: -1,
            domain: String::new(),
            sub: String::new(),
            index: 1,
            retry: 3,
            rate: 30.0,
            tag: String::new(),
            renew: None,
            coupon: String::new(),
            rename: DEFAULT_RENAME.to_string(),
            exclude: PatternSet::from_fragment(DEFAULT_EXCLUDE),
            include: PatternSet::from_fragment(DEFAULT_INCLUDE),
            liveness: true,
            invite_code: String::new(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

impl TaskConfig {
    /// Build a task for one descriptor.
    ///
    /// A multi-URL descriptor has no single subscription, so the task falls
    /// back to its domain.
    pub fn from_descriptor(name: impl Into<String>, descriptor: &SourceDescriptor) -> Self {
        let sub = match descriptor.sub.normalized() {
            Sub::Single(s) => s.trim().to_string(),
            Sub::Many(_) => String::new(),
        };

        let mut task = Self {
            name: name.into(),
            domain: descriptor.domain.trim().to_string(),
            sub,
            renew: descriptor.renew.clone(),
            ..Default::default()
        };
        if !descriptor.rename.is_empty() {
            task.rename = descriptor.rename.clone();
        }
        if !descriptor.exclude.is_empty() {
            task.exclude = descriptor.exclude.clone();
        }
        if !descriptor.include.is_empty() {
            task.include = descriptor.include.clone();
        }
        task
    }

    fn is_addressable(&self) -> bool {
        !self.sub.is_empty() || !self.domain.is_empty()
    }

    fn same_task(&self, other: &TaskConfig) -> bool {
        if !self.sub.is_empty() {
            self.sub == other.sub
        } else {
            self.domain == other.domain && self.index == other.index
        }
    }
}

/// Remove duplicate tasks, folding filters into the first occurrence.
pub fn dedup_tasks(tasks: Vec<TaskConfig>) -> Vec<TaskConfig> {
    let mut items: Vec<TaskConfig> = Vec::with_capacity(tasks.len());
    for task in tasks {
        if !task_exists(&mut items, &task) {
            items.push(task);
        }
    }
    items
}

/// Whether `task` duplicates one of `tasks`. On a match the existing task
/// absorbs the candidate's rename and filter fragments.
///
/// Tasks with neither a subscription nor a domain cannot be fetched and are
/// reported as existing so callers drop them.
pub fn task_exists(tasks: &mut [TaskConfig], task: &TaskConfig) -> bool {
    if !task.is_addressable() {
        error!(name = %task.name, "[DedupError] task has neither sub nor domain");
        return true;
    }

    let Some(item) = tasks.iter_mut().find(|item| task.same_task(item)) else {
        return false;
    };

    if item.rename.is_empty() {
        item.rename = task.rename.clone();
    }
    item.exclude.extend(&task.exclude);
    item.include.extend(&task.include);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(domain: &str, sub: &str, index: u32) -> TaskConfig {
        TaskConfig {
            name: format!("{domain}-{index}"),
            domain: domain.to_string(),
            sub: sub.to_string(),
            index,
            exclude: PatternSet::new(),
            include: PatternSet::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_by_sub() {
        let mut second = task("b.com", "https://a.com/link/abc?sub=1", 2);
        second.exclude = PatternSet::from_fragment("expire");

        let tasks = dedup_tasks(vec![task("a.com", "https://a.com/link/abc?sub=1", 1), second]);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].domain, "a.com");
        assert_eq!(tasks[0].exclude.joined(), "expire");
    }

    #[test]
    fn test_dedup_by_domain_and_index() {
        let tasks = dedup_tasks(vec![
            task("a.com", "", 1),
            task("a.com", "", 2),
            task("a.com", "", 1),
        ]);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].index, 2);
    }

    #[test]
    fn test_dedup_adopts_rename_when_empty() {
        let mut first = task("a.com", "", 1);
        first.rename = String::new();
        let mut second = task("a.com", "", 1);
        second.rename = "{name}".to_string();

        let tasks = dedup_tasks(vec![first, second]);
        assert_eq!(tasks[0].rename, "{name}");
    }

    #[test]
    fn test_unaddressable_task_dropped() {
        let tasks = dedup_tasks(vec![task("", "", 1), task("a.com", "", 1)]);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].domain, "a.com");
    }

    #[test]
    fn test_from_descriptor() {
        let mut descriptor = SourceDescriptor::with_sub(" https://a.com/link/abc?sub=1 ");
        descriptor.domain = "a.com".to_string();
        descriptor.include = PatternSet::from_fragment("hk");

        let task = TaskConfig::from_descriptor("a", &descriptor);
        assert_eq!(task.sub, "https://a.com/link/abc?sub=1");
        assert_eq!(task.rename, DEFAULT_RENAME);
        assert_eq!(task.include.joined(), "hk");
        assert_eq!(task.exclude.joined(), DEFAULT_EXCLUDE);
        assert_eq!(task.taskid, -1);
    }

    #[test]
    fn test_default_filters() {
        let task = TaskConfig::default();
        assert!(task.exclude.joined().starts_with("(?i)(到期|流量|Expire|Traffic"));
        assert!(task.exclude.joined().contains(r"网(\s+)?址"));
        assert_eq!(task.include.joined(), DEFAULT_INCLUDE);
        assert!(regex::Regex::new(DEFAULT_EXCLUDE).is_ok());
        assert!(regex::Regex::new(DEFAULT_INCLUDE).is_ok());

        // folding keeps the defaults in front
        let base = TaskConfig {
            domain: "a.com".to_string(),
            ..Default::default()
        };
        let custom = TaskConfig {
            exclude: PatternSet::from_fragment("expire"),
            ..base.clone()
        };
        let tasks = dedup_tasks(vec![base, custom]);
        assert_eq!(tasks[0].exclude.joined(), format!("{DEFAULT_EXCLUDE}|expire"));
    }
}
