//! 記述統計のヘルパー

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::entity::{Value, ValueKey};

/// 中央値（欠損を除いた値から計算する）
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    Some(quantile_sorted(&sorted, 0.5))
}

/// 昇順に並べたコピー
pub fn sorted(values: &[f64]) -> Vec<f64> {
    values.iter().copied().sorted_by(f64::total_cmp).collect()
}

/// 線形補間による分位点。`sorted` は昇順で空でないこと
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 標本標準偏差 (ddof = 1)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// ピアソンの積率相関係数。定義できない場合は None
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// 値の全順序（数値は数値として、それ以外は種類ごとに比較）
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.key().cmp(&b.key()),
    }
}

/// 最頻値。同数の場合は最も小さい値を返す
pub fn mode<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<ValueKey, (usize, &'a Value)> = HashMap::new();
    for value in values.into_iter().filter(|v| !v.is_missing()) {
        counts.entry(value.key()).or_insert((0, value)).0 += 1;
    }

    counts
        .into_values()
        .max_by(|(ca, va), (cb, vb)| ca.cmp(cb).then_with(|| compare_values(vb, va)))
        .map(|(_, v)| v.clone())
}

/// ヒストグラムの1区間
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// ヒストグラムのビン数の上限
pub const MAX_HISTOGRAM_BINS: usize = 1_000;

/// numpy の `bins="auto"` と同じ規則でビン幅を決めてヒストグラムを作る
///
/// Freedman–Diaconis と Sturges のうち小さい方の幅を使う。IQR が 0 の場合は Sturges のみ。
/// ビン数は `MAX_HISTOGRAM_BINS` で打ち切る。有限でない値を含む場合は空を返す。
pub fn histogram(values: &[f64]) -> Vec<HistogramBin> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return Vec::new();
    }
    let sorted = sorted(values);
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    let range = last - first;
    if !range.is_finite() {
        return Vec::new();
    }
    if range == 0.0 {
        return vec![HistogramBin { start: first - 0.5, end: first + 0.5, count: sorted.len() }];
    }

    let n = sorted.len() as f64;
    let sturges = range / (n.log2() + 1.0);
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
    let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
    let bin_count = ((range / width).ceil() as usize).clamp(1, MAX_HISTOGRAM_BINS);

    let step = range / bin_count as f64;
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            start: first + step * i as f64,
            end: if i + 1 == bin_count { last } else { first + step * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in &sorted {
        // 最後の区間だけ右端を含む
        let idx = (((v - first) / range) * bin_count as f64).floor() as usize;
        bins[idx.min(bin_count - 1)].count += 1;
    }
    bins
}
