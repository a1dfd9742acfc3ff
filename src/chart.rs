use crate::series::SeriesBuffer;
use crate::util::format_relative_tick;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub x: f64,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub points: Vec<ChartPoint>,
    pub x_bounds: [f64; 2],
}

/// Re-express a series as seconds relative to `now`.
///
/// The x range is always `[-window_secs, 0]`. Samples the buffer has not
/// trimmed yet but which are already outside that range at `now` are left out.
pub fn project(buffer: &SeriesBuffer, now: i64) -> Projection {
    let window_secs = buffer.window_ms() as f64 / 1000.0;
    let points = buffer
        .projectable(now)
        .into_iter()
        .filter(|&(x, _)| x <= 0.0 && x > -window_secs)
        .map(|(x, y)| ChartPoint { x, y })
        .collect();

    Projection {
        points,
        x_bounds: [-window_secs, 0.0],
    }
}

impl Projection {
    /// Contiguous runs of present values; an absent value ends a run.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for p in &self.points {
            match p.y {
                Some(y) => current.push((p.x, y)),
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// Four evenly spaced labels from the left bound to "now".
    pub fn x_labels(&self) -> Vec<String> {
        let [lo, hi] = self.x_bounds;
        (0..4)
            .map(|i| format_relative_tick(lo + (hi - lo) * i as f64 / 3.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Sample;
    use proptest::prelude::*;

    const WINDOW: i64 = 1_800_000;

    fn buffer(samples: &[(i64, Option<f64>)], now: i64) -> SeriesBuffer {
        let mut buf = SeriesBuffer::new(WINDOW);
        buf.load_bulk(samples.iter().map(|&(t, v)| Sample::new(t, v)).collect(), now)
            .unwrap();
        buf
    }

    #[test]
    fn x_is_seconds_before_now() {
        let buf = buffer(&[(1_000_000, Some(25.0)), (1_590_000, Some(26.0))], 1_600_000);
        let proj = project(&buf, 1_600_000);
        assert_eq!(proj.x_bounds, [-1800.0, 0.0]);
        assert_eq!(
            proj.points,
            vec![
                ChartPoint { x: -600.0, y: Some(25.0) },
                ChartPoint { x: -10.0, y: Some(26.0) },
            ]
        );
    }

    #[test]
    fn absent_value_projects_to_none_and_splits_segments() {
        let buf = buffer(&[(10_000, Some(7.0)), (20_000, None), (30_000, Some(7.2)), (40_000, Some(7.3))], 40_000);
        let proj = project(&buf, 40_000);
        assert_eq!(proj.points[1].y, None);
        assert_eq!(
            proj.segments(),
            vec![vec![(-30.0, 7.0)], vec![(-10.0, 7.2), (0.0, 7.3)]]
        );
    }

    #[test]
    fn samples_aged_out_since_the_last_trim_are_not_drawn() {
        let buf = buffer(&[(0, Some(1.0)), (600_000, Some(2.0))], 600_000);
        let proj = project(&buf, WINDOW + 1);
        assert_eq!(proj.points.len(), 1);
        assert!(proj.points[0].x > -1800.0);
    }

    #[test]
    fn labels_span_the_window() {
        let proj = project(&SeriesBuffer::new(WINDOW), 0);
        assert_eq!(proj.x_labels(), vec!["-30 min", "-20 min", "-10 min", "now"]);
    }

    proptest! {
        #[test]
        fn prop_projection_is_pure_and_bounded(
            gaps in prop::collection::vec(1i64..60_000, 0..100),
            later in 0i64..3_600_000,
        ) {
            let mut buf = SeriesBuffer::new(WINDOW);
            let mut ts = 0;
            for g in gaps {
                ts += g;
                buf.append(Sample::new(ts, Some(g as f64)), ts).unwrap();
            }
            let now = ts + later;
            let first = project(&buf, now);
            let second = project(&buf, now);
            prop_assert_eq!(&first, &second);
            for p in &first.points {
                prop_assert!(p.x >= first.x_bounds[0] && p.x <= first.x_bounds[1]);
            }
        }
    }
}
