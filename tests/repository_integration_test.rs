// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 排班整表替换、批次保存与查询（文件数据库）
// ==========================================


use route_validator::db::open_sqlite_connection;
use route_validator::domain::report::HoursSummaryWithAllowance;
use route_validator::domain::types::{DayName, DuplicateKeyPolicy, PerDiemZone, WeekParity};
use route_validator::engine::{summarize_original_dwell, PerDiemEvaluator, ValidationOrchestrator};
use route_validator::importer::ScheduleParser;
use route_validator::logging;
use route_validator::repository::{
    NewBatch, PerDiemRateRepository, ScheduleFilter, ScheduleRepository,
    ValidationBatchRepository, VisitQuery,
};
use std::sync::{Arc, Mutex};
use test_helpers::{schedule_table, visits_table};

#[test]
fn test_schedule_replace_and_filter() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = ScheduleRepository::new(&db_path).unwrap();

    let table = schedule_table(&[
        &["A - B", "C1", "Norte", "Lunes 1, Jueves 2", "Martes 1", ""],
        &["D", "C2", "", "Miércoles 2", "", ""],
    ]);
    let schedule = ScheduleParser::new()
        .parse(&table, DuplicateKeyPolicy::LastWriteWins)
        .unwrap();
    assert_eq!(repo.replace_all(&schedule).unwrap(), 4);

    // 整表替换: 第二次上传覆盖第一次
    let table = schedule_table(&[
        &["A - B", "C1", "Norte", "Lunes 1, Jueves 2", "Martes 1", ""],
        &["D", "C2", "", "Miércoles 2, Sábado 1", "", ""],
    ]);
    let schedule = ScheduleParser::new()
        .parse(&table, DuplicateKeyPolicy::LastWriteWins)
        .unwrap();
    assert_eq!(repo.replace_all(&schedule).unwrap(), 5);
    assert_eq!(repo.count().unwrap(), 5);

    let loaded = repo.load_schedule().unwrap();
    assert!(loaded.contains_key("C1_A_Lunes_1"));
    assert!(loaded.contains_key("C2_D_Miercoles_2"));
    assert!(loaded.contains_key("C2_D_Sabado_1"));

    // 星期过滤忽略重音与大小写
    let (items, total) = repo
        .list(
            &ScheduleFilter {
                day: Some("miércoles".to_string()),
                ..Default::default()
            },
            10,
            0,
        )
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].day_name, DayName::Miercoles);

    // "all" 与 0 视为不过滤
    let (_, total) = repo
        .list(
            &ScheduleFilter {
                agent: Some("all".to_string()),
                week: Some(0),
                ..Default::default()
            },
            2,
            0,
        )
        .unwrap();
    assert_eq!(total, 5);

    let (items, total) = repo
        .list(
            &ScheduleFilter {
                line: Some("Linea 2".to_string()),
                week: Some(1),
                ..Default::default()
            },
            10,
            0,
        )
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].agent_id, "B");
    assert_eq!(items[0].week_parity, WeekParity::First);
}

#[test]
fn test_batch_save_round_trip_with_allowances() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path).unwrap()));
    let batch_repo = ValidationBatchRepository::from_connection(conn.clone());
    let rate_repo = PerDiemRateRepository::from_connection(conn);

    assert!(rate_repo.update("INTERIOR", 3000.0).unwrap());

    let schedule = schedule_table(&[
        &["A", "C", "", "Lunes 1", "", ""],
        &["B", "C", "", "Lunes 1", "", ""],
    ]);
    let visits = visits_table(&[
        &["SI", "01/01/2024 08:00:00", "01/01/2024 14:00:00", "1:15:00", "C.A", ""],
        &["SI", "01/01/2024 08:00:00", "01/01/2024 14:00:00", "0:45:00", "C.B", ""],
    ]);
    let window = ValidationOrchestrator::parse_window("01/01/2024", "07/01/2024", 1).unwrap();
    let report = ValidationOrchestrator::default()
        .run(&schedule, &visits, &window)
        .unwrap();
    assert_eq!(report.matched.len(), 2);

    // 线路 "Linea 1" 不含 INTERIOR → CABA_GBA（金额 0）
    let rates = rate_repo.rates_map().unwrap();
    let summaries: Vec<HoursSummaryWithAllowance> = report
        .hours_summary
        .iter()
        .map(|s| {
            let (zone, per_diem_amount) = PerDiemEvaluator::resolve_amount(s, &rates);
            HoursSummaryWithAllowance {
                summary: s.clone(),
                zone,
                per_diem_amount,
            }
        })
        .collect();
    assert!(summaries.iter().all(|s| s.zone == PerDiemZone::CabaGba));

    let dwell_totals = summarize_original_dwell(&report.matched);
    let batch_id = batch_repo
        .save_batch(&NewBatch {
            window: &report.window,
            matched: &report.matched,
            dwell_totals: &dwell_totals,
            hours_summary: &summaries,
            hours_detail: &report.hours_detail,
        })
        .unwrap();

    let details = batch_repo.batch_details(&batch_id).unwrap().unwrap();
    assert_eq!(details.header.date_from, window.start);
    assert_eq!(details.visits.len(), 2);
    // 停留合计用原始时长（不封顶）
    let a_total = details
        .dwell_summary
        .iter()
        .find(|d| d.total.agent_id == "A")
        .unwrap();
    assert_eq!(a_total.total.total_dwell.to_string(), "01:15:00");

    let hours = batch_repo.batch_hours(&batch_id).unwrap().unwrap();
    assert_eq!(hours.summary, summaries);
    assert_eq!(hours.detail, report.hours_detail);

    let recent = batch_repo
        .recent_visits(
            &VisitQuery {
                client: Some("C".to_string()),
                batch_id: Some(batch_id.clone()),
                ..Default::default()
            },
            1,
        )
        .unwrap();
    assert_eq!(recent.len(), 1);

    assert_eq!(batch_repo.dwell_summary(Some("B"), None).unwrap().len(), 1);
}

#[test]
fn test_history_is_newest_first() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = ValidationBatchRepository::new(&db_path).unwrap();
    let window = ValidationOrchestrator::parse_window("01/01/2024", "07/01/2024", 1).unwrap();

    let empty = NewBatch {
        window: &window,
        matched: &[],
        dwell_totals: &[],
        hours_summary: &[],
        hours_detail: &[],
    };
    let first = repo.save_batch(&empty).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = repo.save_batch(&empty).unwrap();

    let history = repo.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].batch_id, second);
    assert_eq!(history[1].batch_id, first);
}
