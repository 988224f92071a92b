//! Static SVG choropleth.

use std::{fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result};
use geo::{BoundingRect, Coord, LineString, Rect};

use crate::{
    config::AppConfig,
    query::Aggregation,
    render::{ColorScale, NO_DATA_LABEL, color::ramp, color_scale, round2},
};

const MARGIN: f64 = 10.0;
const LEGEND_HEIGHT: f64 = 48.0;

/// Equirectangular projection of lon/lat into the drawing area, with the
/// longitude axis shrunk by cos(latitude) of the map center.
struct Projection {
    bounds: Rect<f64>,
    scale: f64,
    kx: f64,
    height: f64,
}

impl Projection {
    fn fit(bounds: Rect<f64>, width: f64, height: f64, center_lat: f64) -> Self {
        let kx = center_lat.to_radians().cos();
        let w = (bounds.width() * kx).max(f64::EPSILON);
        let h = bounds.height().max(f64::EPSILON);
        let scale = ((width - 2.0 * MARGIN) / w).min((height - 2.0 * MARGIN) / h);
        Self { bounds, scale, kx, height }
    }

    #[inline]
    fn project(&self, c: &Coord<f64>) -> (f64, f64) {
        let x = MARGIN + (c.x - self.bounds.min().x) * self.kx * self.scale;
        let y = self.height - MARGIN - (c.y - self.bounds.min().y) * self.scale;
        (x, y)
    }

    fn path(&self, ring: &LineString<f64>, out: &mut String) {
        for (i, c) in ring.coords().enumerate() {
            let (x, y) = self.project(c);
            out.push_str(&format!("{}{:.2},{:.2} ", if i == 0 { "M" } else { "L" }, x, y));
        }
        out.push_str("Z ");
    }
}

/// Write the choropleth to `path`.
pub fn write_svg(aggregation: &Aggregation, config: &AppConfig, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[render::svg] Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    render_svg(&mut writer, aggregation, config)?;
    writer.flush().with_context(|| format!("[render::svg] Failed to flush {}", path.display()))
}

/// Render the choropleth into any writer.
pub fn render_svg<W: Write>(writer: &mut W, aggregation: &Aggregation, config: &AppConfig) -> Result<()> {
    let map = &config.map;
    let width = map.width as f64;
    let map_height = map.height as f64;
    let height = map_height + LEGEND_HEIGHT;

    writeln!(writer, r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##)?;
    writeln!(writer, r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##)?;
    let page = &config.page;
    let title = if page.icon.is_empty() { page.title.clone() } else { format!("{} {}", page.icon, page.title) };
    writeln!(writer, "<title>{}</title>", escape(&title))?;
    writeln!(writer, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
    writeln!(writer, r##"<defs>
<style>
    .unit {{ stroke: #111827; stroke-width: 0.4; fill-rule: evenodd; }}
    .legend {{ font: 12px sans-serif; fill: #111827; }}
</style>
</defs>"##)?;

    let bounds = aggregation.regions.iter()
        .filter_map(|r| r.geometry().bounding_rect())
        .reduce(|a, b| Rect::new(
            Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        ));

    match (bounds, color_scale(aggregation)) {
        (Some(bounds), Some(scale)) => {
            let proj = Projection::fit(bounds, width, map_height, map.center_lat);
            writeln!(writer, r#"<g fill-opacity="{}">"#, map.opacity)?;
            for region in &aggregation.regions {
                let mut d = String::new();
                for polygon in &region.geometry().0 {
                    proj.path(polygon.exterior(), &mut d);
                    for hole in polygon.interiors() { proj.path(hole, &mut d) }
                }
                writeln!(
                    writer,
                    r#"<path class="unit" d="{}" fill="{}"><title>{}: {:.2}</title></path>"#,
                    d.trim_end(),
                    scale.color(region.value),
                    escape(&region.unit_id),
                    round2(region.value),
                )?;
            }
            writeln!(writer, "</g>")?;
            write_legend(writer, &scale, &map.legend, map_height, width)?;
        }
        _ => {
            writeln!(
                writer,
                r#"<text class="legend" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                width / 2.0,
                map_height / 2.0,
                escape(NO_DATA_LABEL),
            )?;
        }
    }

    writeln!(writer, "</svg>")?;
    Ok(())
}

fn write_legend<W: Write>(writer: &mut W, scale: &ColorScale, label: &str, top: f64, width: f64) -> Result<()> {
    const STEPS: usize = 20;
    let bar_width = (width - 2.0 * MARGIN) / STEPS as f64;
    for i in 0..STEPS {
        let color = ramp(i as f64 / (STEPS - 1) as f64);
        writeln!(
            writer,
            r#"<rect x="{:.2}" y="{}" width="{:.2}" height="10" fill="{}"/>"#,
            MARGIN + i as f64 * bar_width, top + 4.0, bar_width + 0.5, color,
        )?;
    }
    writeln!(writer, r#"<text class="legend" x="{MARGIN}" y="{}">{}</text>"#, top + 28.0, scale.min)?;
    writeln!(writer, r#"<text class="legend" x="{}" y="{}" text-anchor="end">{}</text>"#, width - MARGIN, top + 28.0, scale.max)?;
    writeln!(writer, r#"<text class="legend" x="{}" y="{}" text-anchor="middle">{}</text>"#, width / 2.0, top + 42.0, escape(label))?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
