//! Dashboard rendering using Plotters
//!
//! Four panels on a 2×2 grid: loyal lifestage counts, loyal premium-tier
//! counts, revenue of the top products and a box plot of loyal sale amounts.

use crate::customers::{LoyalProfile, ValueCounts};
use crate::products::ProductMetrics;
use crate::schema::{LIFESTAGE, PREMIUM_CUSTOMER, PRODUCT_ID, TOTAL_SALES};
use anyhow::ensure;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

/// 15×12 units at 100 pixels per unit
pub const DASHBOARD_SIZE: (u32, u32) = (1500, 1200);

/// ggplot-style panel background
const PANEL_COLOR: RGBColor = RGBColor(229, 229, 229);
const BAR_COLOR: RGBColor = RGBColor(226, 74, 51);
const BOX_COLOR: RGBColor = RGBColor(52, 138, 189);

const CAPTION_FONT: (&str, i32) = ("sans-serif", 26);
const AXIS_FONT: (&str, i32) = ("sans-serif", 16);

/// Half the width of a bar in category units
const BAR_HALF_WIDTH: f64 = 0.4;

/// Render the four-panel dashboard to a PNG file, overwriting it
///
/// # Arguments
/// * `profile` - Loyal-customer breakdown and sale amounts
/// * `top_products` - Products to show in the revenue panel, best first
/// * `output_path` - Destination PNG path
pub fn render_dashboard(
    profile: &LoyalProfile,
    top_products: &[ProductMetrics],
    output_path: &Path,
) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, DASHBOARD_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((2, 2));

    draw_horizontal_counts(
        &panels[0],
        "Lifestage Distribution of Loyal Customers",
        LIFESTAGE,
        &profile.lifestages,
    )?;
    draw_vertical_counts(
        &panels[1],
        "Premium vs Regular Customers",
        PREMIUM_CUSTOMER,
        &profile.premium_tiers,
    )?;

    let revenue: Vec<(String, f64)> = top_products
        .iter()
        .map(|m| (m.product_id.to_string(), m.total_revenue))
        .collect();
    draw_vertical_bars(
        &panels[2],
        &format!("Top {} Products by Revenue", top_products.len()),
        PRODUCT_ID,
        "total_revenue",
        &revenue,
    )?;

    draw_box_plot(&panels[3], "Sales Distribution", TOTAL_SALES, &profile.sales)?;

    root.present()?;
    debug!(path = %output_path.display(), "Dashboard rendered");

    Ok(())
}

/// Category name for an axis position, blank between categories
fn category_label(categories: &[(String, f64)], position: f64) -> String {
    let index = position.round();
    if (position - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    categories
        .get(index as usize)
        .map(|(name, _)| name.clone())
        .unwrap_or_default()
}

fn as_bars(counts: &ValueCounts) -> Vec<(String, f64)> {
    counts
        .in_appearance_order()
        .iter()
        .map(|(value, count)| (value.clone(), *count as f64))
        .collect()
}

fn value_range(bars: &[(String, f64)]) -> std::ops::Range<f64> {
    let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    0.0..if max > 0.0 { max * 1.1 } else { 1.0 }
}

fn category_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

fn draw_vertical_counts<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    category_desc: &str,
    counts: &ValueCounts,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    draw_vertical_bars(area, title, category_desc, "count", &as_bars(counts))
}

fn draw_vertical_bars<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    category_desc: &str,
    value_desc: &str,
    bars: &[(String, f64)],
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(category_range(bars.len()), value_range(bars))?;

    chart.plotting_area().fill(&PANEL_COLOR)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(WHITE)
        .light_line_style(WHITE.mix(0.5))
        .x_labels(bars.len().max(1))
        .x_label_formatter(&|x| category_label(bars, *x))
        .x_desc(category_desc)
        .y_desc(value_desc)
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let x = i as f64;
        Rectangle::new(
            [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, *value)],
            BAR_COLOR.filled(),
        )
    }))?;

    Ok(())
}

/// Count bars laid out along the y axis, first category on top
fn draw_horizontal_counts<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    category_desc: &str,
    counts: &ValueCounts,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    // Reverse so the first category ends up at the top of the axis
    let mut bars = as_bars(counts);
    bars.reverse();

    let mut chart = ChartBuilder::on(area)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(230)
        .build_cartesian_2d(value_range(&bars), category_range(bars.len()))?;

    chart.plotting_area().fill(&PANEL_COLOR)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .bold_line_style(WHITE)
        .light_line_style(WHITE.mix(0.5))
        .y_labels(bars.len().max(1))
        .y_label_formatter(&|y| category_label(&bars, *y))
        .x_desc("count")
        .y_desc(category_desc)
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, count))| {
        let y = i as f64;
        Rectangle::new(
            [(0.0, y - BAR_HALF_WIDTH), (*count, y + BAR_HALF_WIDTH)],
            BAR_COLOR.filled(),
        )
    }))?;

    Ok(())
}

/// Five-number summary drawn as a box plot
#[derive(Debug, Clone, PartialEq)]
struct BoxStats {
    q1: f64,
    median: f64,
    q3: f64,
    /// Whisker ends: the most extreme values inside 1.5 IQR of the box
    low: f64,
    high: f64,
    outliers: Vec<f64>,
}

impl BoxStats {
    fn new(values: &[f64]) -> Self {
        let quartiles = Quartiles::new(values);
        let [lower_fence, q1, median, q3, upper_fence] = quartiles.values().map(f64::from);

        let inside = values
            .iter()
            .copied()
            .filter(|v| *v >= lower_fence && *v <= upper_fence);
        let low = inside.clone().fold(f64::INFINITY, f64::min).min(q1);
        let high = inside.fold(f64::NEG_INFINITY, f64::max).max(q3);
        let outliers = values
            .iter()
            .copied()
            .filter(|v| *v < lower_fence || *v > upper_fence)
            .collect();

        Self {
            q1,
            median,
            q3,
            low,
            high,
            outliers,
        }
    }
}

fn draw_box_plot<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    value_desc: &str,
    values: &[f64],
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    ensure!(!values.is_empty(), "no values to draw in `{}`", title);

    let stats = BoxStats::new(values);
    let min = values.iter().copied().fold(stats.low, f64::min);
    let max = values.iter().copied().fold(stats.high, f64::max);
    let padding = ((max - min) * 0.05).max(0.5);

    let mut chart = ChartBuilder::on(area)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(70)
        .build_cartesian_2d(-1f64..1f64, (min - padding)..(max + padding))?;

    chart.plotting_area().fill(&PANEL_COLOR)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(WHITE)
        .light_line_style(WHITE.mix(0.5))
        .x_labels(1)
        .x_label_formatter(&|_| String::new())
        .y_desc(value_desc)
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    let half = 0.3;
    let cap = 0.15;
    let outline = BLACK.stroke_width(2);

    chart.draw_series(std::iter::once(Rectangle::new(
        [(-half, stats.q1), (half, stats.q3)],
        BOX_COLOR.mix(0.8).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(-half, stats.q1), (half, stats.q3)],
        outline,
    )))?;
    chart.draw_series(
        [
            vec![(-half, stats.median), (half, stats.median)],
            vec![(0.0, stats.q3), (0.0, stats.high)],
            vec![(0.0, stats.q1), (0.0, stats.low)],
            vec![(-cap, stats.high), (cap, stats.high)],
            vec![(-cap, stats.low), (cap, stats.low)],
        ]
        .into_iter()
        .map(|points| PathElement::new(points, outline)),
    )?;
    chart.draw_series(
        stats
            .outliers
            .iter()
            .map(|v| Circle::new((0.0, *v), 4, BLACK.stroke_width(1))),
    )?;

    Ok(())
}
