//! Health monitoring for pool managers

/// Health status of a pool manager
///
/// # Examples
///
/// ```
/// use lru_objectpool::LruPoolManager;
///
/// let manager = LruPoolManager::create();
///
/// let health = manager.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.item_count, 0);
/// assert_eq!(health.item_max_bound, 1024);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the manager is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Pooled objects against the max bound (0.0 to 1.0, above 1.0 when over)
    pub utilization: f64,

    /// Objects currently pooled
    pub item_count: usize,

    /// Current eviction trigger
    pub item_max_bound: usize,

    /// Whether an eviction pass is left unfinished
    pub gc_pending: bool,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(item_count: usize, item_max_bound: usize, gc_pending: bool, accounting_drift: usize) -> Self {
        let utilization = if item_max_bound > 0 {
            item_count as f64 / item_max_bound as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        // Over the bound means eviction could not keep up
        if item_count > item_max_bound {
            warnings.push(format!("Over max bound: {} > {}", item_count, item_max_bound));
            is_healthy = false;
        } else if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
        }

        if gc_pending {
            warnings.push("Eviction pass pending, call proc() to finish it".to_string());
        }

        if accounting_drift > 0 {
            warnings.push(format!("Item count differs from check list by {}", accounting_drift));
            is_healthy = false;
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            item_count,
            item_max_bound,
            gc_pending,
            warnings,
        }
    }

    /// Check if the manager is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy() {
        let health = HealthStatus::new(10, 100, false, 0);
        assert!(health.is_healthy());
        assert_eq!(health.warning_count, 0);
        assert!((health.utilization - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_high_utilization_warns() {
        let health = HealthStatus::new(95, 100, true, 0);
        assert!(health.is_healthy());
        assert_eq!(health.warning_count, 2);
    }

    #[test]
    fn test_over_bound_and_drift_are_unhealthy() {
        assert!(!HealthStatus::new(101, 100, false, 0).is_healthy());
        assert!(!HealthStatus::new(1, 100, false, 3).is_healthy());
    }
}
