use ordereda::application::{Analysis, UnivariateView};
use ordereda::domain::entity::{CleaningConfig, MissingValueStrategy};
use ordereda::infrastructure::parser::DelimitedParser;
use ordereda::application::DatasetPreparer;
use strum::IntoEnumIterator;

const ORDERS: &str = "\
order_id,customer_id,product_id,order_date,price,quantity,category
1001,C01,P10,2024-03-01 09:15:00,19.99,2,Books
1001,C01,P10,2024-03-01 09:15:00,19.99,2,Books
1002,C02,P11,2024-03-01 11:40:00,5.50,1,Toys
1003,C03,P12,2024-03-01 17:05:00,42.00,,Games
1004,C04,P10,2024-03-02 08:30:00,19.99,3,
1005,C05,P13,not a date,7.25,1,Toys
1006,C06,P14,2024-03-02 13:00:00,-1.00,1,Books
1007,C07,P15,2024-03-03 10:10:00,,4,Games
1008,C08,P11,2024-03-03 15:45:00,5.50,2,Toys
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ordereda 基本動作チェック ===\n");

    // 1. 読み込み
    println!("1. CSV の読み込み");
    let parser = DelimitedParser::default();
    let raw = parser.parse("orders", ORDERS.as_bytes())?;
    for column in &raw.schema.columns {
        println!("  {}", column);
    }
    println!("  {} 行\n", raw.len());

    // 2. 方針ごとのクリーニング結果
    println!("2. 欠損値処理ごとのクリーニング");
    for strategy in MissingValueStrategy::iter() {
        let prepared = DatasetPreparer::new(CleaningConfig::with_strategy(strategy)).prepare(&raw);
        let report = &prepared.report;
        println!(
            "  {:<22} 重複 {} / 日付不正 {} / 欠損削除 {} / 補完不可 {} / 不正値 {} -> {:?}",
            strategy.to_string(),
            report.removed_duplicate_count,
            report.unparseable_date_count,
            report.removed_missing_count,
            report.removed_unfillable_count,
            report.removed_invalid_count,
            report.shape(),
        );
        for warning in &report.warnings {
            println!("    警告: {}", warning);
        }
    }
    println!();

    // 3. 集計ビュー
    let prepared = DatasetPreparer::new(CleaningConfig::with_strategy(MissingValueStrategy::FillCentralTendency))
        .prepare(&raw);
    let analysis = Analysis::of(&prepared);

    println!("3. カラム分類");
    println!("  識別子: {:?}", prepared.classification.identifier);
    println!("  数値: {:?}", prepared.classification.numeric);
    println!("  カテゴリ: {:?}\n", prepared.classification.categorical);

    println!("4. 数量の分布");
    match analysis.univariate("quantity")? {
        UnivariateView::Discrete { counts, .. } => {
            for c in counts {
                println!("  {} : {}", c.value, c.count);
            }
        },
        UnivariateView::Distribution { bins, summary, .. } => {
            println!("  平均 {:.2} / 最小 {} / 最大 {}", summary.mean, summary.min, summary.max);
            for bin in bins {
                println!("  [{:.2}, {:.2}) : {}", bin.start, bin.end, bin.count);
            }
        },
    }
    println!();

    println!("5. カテゴリ別の件数");
    for c in analysis.categorical("category")?.counts {
        println!("  {} : {}", c.value, c.count);
    }
    println!();

    println!("6. カテゴリ別の価格");
    for group in analysis.bivariate()?.groups {
        println!(
            "  {} : min {} / q1 {} / median {} / q3 {} / max {}",
            group.category, group.min, group.q1, group.median, group.q3, group.max
        );
    }
    println!();

    println!("7. 日次の価格推移");
    for candle in analysis.time_series()?.candles {
        println!(
            "  {} : O {} H {} L {} C {}",
            candle.date, candle.open, candle.high, candle.low, candle.close
        );
    }
    println!();

    println!("8. 相関行列");
    let matrix = analysis.correlation()?;
    for (name, row) in matrix.columns.iter().zip(&matrix.values) {
        let cells: Vec<String> = row.iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |r| format!("{:.3}", r)))
            .collect();
        println!("  {:<10} {}", name, cells.join("  "));
    }

    println!("\n=== 完了 ===");
    Ok(())
}
