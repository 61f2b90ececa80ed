/*
 * @Author       : 老董
 * @Date         : 2026-05-16
 * @Description  : 延迟样本的在线统计量（Welford 算法）
 */

/// 流式统计量：样本逐个喂入，不保留历史。
///
/// 均值/方差采用 Welford 单遍算法，长跑（上万次迭代）下
/// 不会像朴素的平方和累加那样丢失精度。
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个样本
    pub fn add(&mut self, sample: f64) {
        self.count += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.count as f64;
        // 注意：第二个差值用的是更新后的均值
        self.m2 += delta * (sample - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 样本均值，无样本时为 0
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 无偏样本方差（除以 n-1），样本数不足 2 时为 0
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}
