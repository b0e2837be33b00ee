/// Weight bounds accepted by the load balancer.
pub const MAX_WEIGHT: u32 = 999;

/// One target group participating in a weighted forward action.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetGroupWeight {
    pub arn: String,
    /// Name parsed from the ARN ("web-canary-tg").
    pub name: String,
    pub weight: u32,
}

/// The forward rule routing traffic for one service.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficRule {
    /// Empty when the rule is the listener's default action.
    pub rule_arn: String,
    pub listener_arn: String,
    pub is_default: bool,
    pub service_key: String,
    /// "Default" or "Rule <priority>".
    pub label: String,
    pub targets: Vec<TargetGroupWeight>,
}

impl TrafficRule {
    pub fn weights(&self) -> Vec<u32> {
        self.targets.iter().map(|t| t.weight).collect()
    }

    pub fn total_weight(&self) -> u32 {
        self.targets.iter().map(|t| t.weight).sum()
    }

    /// Percentage of traffic a target receives, rounded down.
    pub fn share_of(&self, index: usize) -> u32 {
        let total = self.total_weight();
        match self.targets.get(index) {
            Some(t) if total > 0 => t.weight * 100 / total,
            _ => 0,
        }
    }
}
