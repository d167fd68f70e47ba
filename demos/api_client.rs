use ordereda::application::UnivariateView;
use ordereda::client::EdaClient;
use ordereda::domain::entity::MissingValueStrategy;

const ORDERS: &str = "\
order_id,customer_id,product_id,order_date,price,quantity,category
1,C1,P1,2024-01-01 09:00:00,10.0,2,Books
2,C2,P2,2024-01-01 12:00:00,15.0,1,Toys
3,C3,P3,2024-01-01 18:00:00,8.0,3,Books
4,C4,P4,2024-01-02 10:00:00,,1,Toys
5,C5,P5,2024-01-02 11:00:00,12.0,,Games
6,C6,P6,2024-01-02 16:30:00,9.5,2,Games
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("ORDEREDA_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let client = EdaClient::new(base_url);

    println!("=== ordereda API テスト ===\n");

    // 1. ヘルスチェック
    println!("1. ヘルスチェック");
    println!("稼働中: {}\n", client.health().await?);

    // 2. アップロード
    println!("2. アップロード（drop）");
    let session = client.upload("orders.csv", ORDERS, MissingValueStrategy::Drop).await?;
    let id = session.session_id;
    println!("セッション: {}", id);
    println!("クリーニング結果: {}\n", serde_json::to_string_pretty(&session.report)?);

    // 3. プレビュー
    println!("3. プレビュー");
    let preview = client.preview(id, 5).await?;
    println!("カラム: {:?}", preview.columns);
    for row in preview.rows {
        println!("{}", row);
    }
    println!();

    // 4. 各ビュー
    println!("4. 単変量ビュー（price）");
    match client.univariate(id, "price").await? {
        UnivariateView::Discrete { counts, .. } => println!("値ごとの件数: {:?}\n", counts),
        UnivariateView::Distribution { summary, bins, .. } => {
            println!("要約: {:?}", summary);
            println!("ビン: {:?}\n", bins);
        },
    }

    println!("5. カテゴリビュー");
    println!("{:?}\n", client.categorical(id, "category").await?.counts);

    println!("6. カテゴリ別価格");
    println!("{:?}\n", client.bivariate(id).await?.groups);

    println!("7. 日次四本値");
    println!("{:?}\n", client.time_series(id).await?.candles);

    println!("8. 相関行列");
    let matrix = client.correlation(id).await?;
    println!("{:?} {:?}\n", matrix.columns, matrix.values);

    // 5. 方針の変更
    println!("9. 欠損値処理を fill_constant に変更");
    let updated = client.set_strategy(id, MissingValueStrategy::FillConstant).await?;
    println!("最終行数: {}\n", updated.report.final_row_count);

    // 6. エラー
    println!("10. 存在しないカラム");
    if let Err(err) = client.univariate(id, "discount").await {
        println!("エラー: {}\n", err);
    }

    println!("11. セッション削除");
    client.delete(id).await?;
    println!("残りのセッション: {:?}", client.sessions().await?);

    println!("\n=== テスト完了 ===");
    Ok(())
}
