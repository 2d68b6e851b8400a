// ==========================================
// 巡店路线校验系统 - 报表导出
// ==========================================
// 职责: 将校验结果写为三张 CSV 报表
// 输出: Visitas.csv / Horas_Resumen.csv / Horas_Detalle.csv
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::hours::{DailyHoursRecord, VendorHoursSummary};
use crate::domain::report::ValidationReport;
use crate::domain::visit::MatchedVisit;
use crate::repository::row_mapping::{format_date, format_datetime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const VISITS_FILE: &str = "Visitas.csv";
pub const HOURS_SUMMARY_FILE: &str = "Horas_Resumen.csv";
pub const HOURS_DETAIL_FILE: &str = "Horas_Detalle.csv";

/// 导出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedReport {
    pub visits: PathBuf,
    pub hours_summary: PathBuf,
    pub hours_detail: PathBuf,
}

fn write_visits(path: &Path, rows: &[MatchedVisit]) -> ApiResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Vendedor",
        "Cliente",
        "Fecha Checkin",
        "Fecha Checkout",
        "Tiempo en PDV Original",
        "Tiempo en PDV",
        "Dia",
        "Semana",
        "Planificado",
        "Bloque",
        "Linea",
        "Estado",
    ])?;
    for v in rows {
        writer.write_record([
            v.agent_id.clone(),
            v.client_id.clone(),
            format_datetime(v.checkin_at),
            v.checkout_at.map(format_datetime).unwrap_or_default(),
            v.dwell_raw.clone(),
            v.dwell.clone(),
            v.weekday.to_string(),
            v.week.to_string(),
            v.planned_raw_text.clone(),
            v.block.clone(),
            v.origin_line.clone(),
            v.status.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary(path: &Path, rows: &[VendorHoursSummary]) -> ApiResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Vendedor",
        "Total Trabajado",
        "Dias Trabajados",
        "Promedio Diario",
        "Promedio Checkin",
        "Promedio Checkout",
        "Viatico",
        "Linea",
    ])?;
    for s in rows {
        writer.write_record([
            s.agent_id.clone(),
            s.total_worked.to_string(),
            s.days_worked.to_string(),
            s.average_daily.to_string(),
            s.average_checkin.to_string(),
            s.average_checkout.to_string(),
            if s.per_diem_eligible { "SI" } else { "NO" }.to_string(),
            s.line.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_detail(path: &Path, rows: &[DailyHoursRecord]) -> ApiResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Vendedor",
        "Fecha",
        "Primer Checkin",
        "Ultimo Checkout",
        "Horas",
        "Primer Cliente",
    ])?;
    for d in rows {
        writer.write_record([
            d.agent_id.clone(),
            format_date(d.date),
            format_datetime(d.first_checkin),
            format_datetime(d.last_checkout),
            d.span.to_string(),
            d.first_client.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// 导出三张报表到目录（目录不存在则创建）
pub fn export_report(report: &ValidationReport, out_dir: &Path) -> ApiResult<ExportedReport> {
    fs::create_dir_all(out_dir)?;

    let exported = ExportedReport {
        visits: out_dir.join(VISITS_FILE),
        hours_summary: out_dir.join(HOURS_SUMMARY_FILE),
        hours_detail: out_dir.join(HOURS_DETAIL_FILE),
    };

    write_visits(&exported.visits, &report.matched)?;
    write_summary(&exported.hours_summary, &report.hours_summary)?;
    write_detail(&exported.hours_detail, &report.hours_detail)?;

    info!(dir = %out_dir.display(), "报表已导出");
    Ok(exported)
}
