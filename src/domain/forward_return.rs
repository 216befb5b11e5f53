//! Close-to-next-open forward returns.
//!
//! RET[t] = OPEN[t+1] / CLOSE[t] - 1
//! The last calendar date has no next session and is always undefined.

use crate::domain::calendar::AlignedInstrument;

pub fn next_open_returns(instrument: &AlignedInstrument) -> Vec<Option<f64>> {
    let bars = &instrument.bars;
    let mut out = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let ret = match (bars.get(i), bars.get(i + 1)) {
            (Some(Some(today)), Some(Some(next))) if today.close != 0.0 => {
                Some(next.open / today.close - 1.0).filter(|r| r.is_finite())
            }
            _ => None,
        };
        out.push(ret);
    }

    out
}
