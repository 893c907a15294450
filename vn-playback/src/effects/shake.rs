//! # Shake 模块
//!
//! 震屏效果：强度映射到四个互斥的档位，每档有固定时长。

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// 震屏档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShakeTier {
    /// 1..=25
    Light,
    /// 26..=50
    Medium,
    /// 51..=75
    Strong,
    /// 76..=100
    Violent,
}

impl ShakeTier {
    /// 根据强度选择档位，超出 1..=100 时返回 `None`
    pub fn from_intensity(intensity: i64) -> Option<Self> {
        match intensity {
            1..=25 => Some(Self::Light),
            26..=50 => Some(Self::Medium),
            51..=75 => Some(Self::Strong),
            76..=100 => Some(Self::Violent),
            _ => None,
        }
    }

    /// 档位序号（1..=4）
    pub fn level(&self) -> u8 {
        match self {
            Self::Light => 1,
            Self::Medium => 2,
            Self::Strong => 3,
            Self::Violent => 4,
        }
    }

    /// 效果时长
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Light => 400,
            Self::Medium => 600,
            Self::Strong => 800,
            Self::Violent => 1000,
        }
    }

    /// 样式名
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Light => "shake-1-25",
            Self::Medium => "shake-26-50",
            Self::Strong => "shake-51-75",
            Self::Violent => "shake-76-100",
        }
    }
}

/// 开始震屏，返回需要等待的时长
///
/// 先清除之前的档位再应用新档位。强度无效时什么都不做，返回 `None`。
pub fn perform(stage: &mut Stage, intensity: i64) -> Option<u64> {
    let tier = ShakeTier::from_intensity(intensity)?;
    if stage.shake().is_some() {
        stage.set_shake(None);
    }
    stage.set_shake(Some(tier));
    Some(tier.duration_ms())
}

/// 震屏结束，移除档位
pub fn finish(stage: &mut Stage) {
    stage.set_shake(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::MemorySurface;

    #[test]
    fn test_tier_boundaries() {
        let cases = [1, 25, 26, 50, 51, 75, 76, 100];
        let levels: Vec<u8> = cases
            .iter()
            .map(|&i| ShakeTier::from_intensity(i).unwrap().level())
            .collect();
        let durations: Vec<u64> = cases
            .iter()
            .map(|&i| ShakeTier::from_intensity(i).unwrap().duration_ms())
            .collect();

        assert_eq!(levels, vec![1, 1, 2, 2, 3, 3, 4, 4]);
        assert_eq!(durations, vec![400, 400, 600, 600, 800, 800, 1000, 1000]);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let surface = MemorySurface::new();
        let mut stage = Stage::new(Box::new(surface.clone()));
        assert_eq!(perform(&mut stage, 0), None);
        assert_eq!(perform(&mut stage, 101), None);
        assert_eq!(perform(&mut stage, -5), None);
        assert!(surface.take_log().is_empty());
    }

    #[test]
    fn test_prior_tier_cleared() {
        let surface = MemorySurface::new();
        let mut stage = Stage::new(Box::new(surface.clone()));

        assert_eq!(perform(&mut stage, 10), Some(400));
        assert_eq!(perform(&mut stage, 90), Some(1000));
        assert_eq!(surface.state().shake, Some(ShakeTier::Violent));

        finish(&mut stage);
        assert_eq!(stage.shake(), None);
        assert_eq!(
            surface.take_log(),
            vec!["shake:shake-1-25", "shake:shake-76-100"]
        );
    }
}
