//! Candlestick pattern detection over the last one to three bars.
//!
//! All thresholds are ratios of candle body, shadow and range. Precedence in
//! [`detect_pattern`] is three-candle, then two-candle, then single-candle,
//! then a generic signed body/range score.

use std::fmt;

use crate::domain::ohlcv::Bar;

/// Doji: body no larger than this fraction of the range.
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Hammer / shooting star: dominant shadow at least this multiple of the body.
pub const SHADOW_BODY_MULTIPLE: f64 = 2.0;
/// Morning / evening star: first candle body at least this fraction of range.
pub const STAR_LEAD_BODY_RATIO: f64 = 0.6;
/// Morning / evening star: middle body at most this fraction of the first body.
pub const STAR_MIDDLE_BODY_RATIO: f64 = 0.3;
/// Soldiers / crows: each body at least this fraction of its range.
pub const SOLDIER_BODY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandlePattern {
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    MorningStar,
    EveningStar,
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
    Hammer,
    ShootingStar,
    Doji,
    BullishCandle,
    BearishCandle,
    None,
}

impl CandlePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandlePattern::ThreeWhiteSoldiers => "three_white_soldiers",
            CandlePattern::ThreeBlackCrows => "three_black_crows",
            CandlePattern::MorningStar => "morning_star",
            CandlePattern::EveningStar => "evening_star",
            CandlePattern::BullishEngulfing => "bullish_engulfing",
            CandlePattern::BearishEngulfing => "bearish_engulfing",
            CandlePattern::BullishHarami => "bullish_harami",
            CandlePattern::BearishHarami => "bearish_harami",
            CandlePattern::Hammer => "hammer",
            CandlePattern::ShootingStar => "shooting_star",
            CandlePattern::Doji => "doji",
            CandlePattern::BullishCandle => "bullish_candle",
            CandlePattern::BearishCandle => "bearish_candle",
            CandlePattern::None => "none",
        }
    }
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSignal {
    pub pattern: CandlePattern,
    pub strength: f64,
    pub direction: PatternDirection,
}

impl PatternSignal {
    pub const NONE: PatternSignal = PatternSignal {
        pattern: CandlePattern::None,
        strength: 0.0,
        direction: PatternDirection::Neutral,
    };

    fn new(pattern: CandlePattern, strength: f64) -> Self {
        let direction = if strength > 0.0 {
            PatternDirection::Bullish
        } else if strength < 0.0 {
            PatternDirection::Bearish
        } else {
            PatternDirection::Neutral
        };
        PatternSignal {
            pattern,
            strength,
            direction,
        }
    }
}

pub fn is_doji(bar: &Bar) -> bool {
    let range = bar.range();
    range > 0.0 && bar.body() <= range * DOJI_BODY_RATIO
}

pub fn is_hammer(bar: &Bar) -> bool {
    let body = bar.body();
    body > 0.0 && bar.lower_shadow() >= SHADOW_BODY_MULTIPLE * body && bar.upper_shadow() <= body
}

pub fn is_shooting_star(bar: &Bar) -> bool {
    let body = bar.body();
    body > 0.0 && bar.upper_shadow() >= SHADOW_BODY_MULTIPLE * body && bar.lower_shadow() <= body
}

pub fn is_bullish_engulfing(prev: &Bar, curr: &Bar) -> bool {
    prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body()
}

pub fn is_bearish_engulfing(prev: &Bar, curr: &Bar) -> bool {
    prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body()
}

pub fn is_bullish_harami(prev: &Bar, curr: &Bar) -> bool {
    prev.is_bearish() && curr.is_bullish() && curr.open > prev.close && curr.close < prev.open
}

pub fn is_bearish_harami(prev: &Bar, curr: &Bar) -> bool {
    prev.is_bullish() && curr.is_bearish() && curr.open < prev.close && curr.close > prev.open
}

pub fn is_morning_star(first: &Bar, middle: &Bar, last: &Bar) -> bool {
    first.is_bearish()
        && first.body() >= first.range() * STAR_LEAD_BODY_RATIO
        && middle.body() <= first.body() * STAR_MIDDLE_BODY_RATIO
        && middle.body_top() < first.close
        && last.is_bullish()
        && last.close > (first.open + first.close) / 2.0
}

pub fn is_evening_star(first: &Bar, middle: &Bar, last: &Bar) -> bool {
    first.is_bullish()
        && first.body() >= first.range() * STAR_LEAD_BODY_RATIO
        && middle.body() <= first.body() * STAR_MIDDLE_BODY_RATIO
        && middle.body_bottom() > first.close
        && last.is_bearish()
        && last.close < (first.open + first.close) / 2.0
}

fn strong_body(bar: &Bar) -> bool {
    bar.range() > 0.0 && bar.body() >= bar.range() * SOLDIER_BODY_RATIO
}

pub fn is_three_white_soldiers(a: &Bar, b: &Bar, c: &Bar) -> bool {
    [a, b, c].iter().all(|bar| bar.is_bullish() && strong_body(bar))
        && b.close > a.close
        && c.close > b.close
        && b.open > a.open
        && b.open < a.close
        && c.open > b.open
        && c.open < b.close
}

pub fn is_three_black_crows(a: &Bar, b: &Bar, c: &Bar) -> bool {
    [a, b, c].iter().all(|bar| bar.is_bearish() && strong_body(bar))
        && b.close < a.close
        && c.close < b.close
        && b.open < a.open
        && b.open > a.close
        && c.open < b.open
        && c.open > b.close
}

/// Strongest pattern ending at the last bar.
pub fn detect_pattern(bars: &[Bar]) -> PatternSignal {
    let n = bars.len();
    if n == 0 {
        return PatternSignal::NONE;
    }
    let last = &bars[n - 1];

    if n >= 3 {
        let (a, b) = (&bars[n - 3], &bars[n - 2]);
        if is_three_white_soldiers(a, b, last) {
            return PatternSignal::new(CandlePattern::ThreeWhiteSoldiers, 3.0);
        }
        if is_three_black_crows(a, b, last) {
            return PatternSignal::new(CandlePattern::ThreeBlackCrows, -3.0);
        }
        if is_morning_star(a, b, last) {
            return PatternSignal::new(CandlePattern::MorningStar, 2.5);
        }
        if is_evening_star(a, b, last) {
            return PatternSignal::new(CandlePattern::EveningStar, -2.5);
        }
    }

    if n >= 2 {
        let prev = &bars[n - 2];
        if is_bullish_engulfing(prev, last) {
            return PatternSignal::new(CandlePattern::BullishEngulfing, 2.0);
        }
        if is_bearish_engulfing(prev, last) {
            return PatternSignal::new(CandlePattern::BearishEngulfing, -2.0);
        }
        if is_bullish_harami(prev, last) {
            return PatternSignal::new(CandlePattern::BullishHarami, 1.5);
        }
        if is_bearish_harami(prev, last) {
            return PatternSignal::new(CandlePattern::BearishHarami, -1.5);
        }
    }

    if is_hammer(last) {
        return PatternSignal::new(CandlePattern::Hammer, 1.0);
    }
    if is_shooting_star(last) {
        return PatternSignal::new(CandlePattern::ShootingStar, -1.0);
    }
    if is_doji(last) {
        return PatternSignal::new(CandlePattern::Doji, 0.0);
    }

    let range = last.range();
    if range <= 0.0 {
        return PatternSignal::NONE;
    }
    let score = (last.close - last.open) / range;
    if score > 0.0 {
        PatternSignal::new(CandlePattern::BullishCandle, score)
    } else if score < 0.0 {
        PatternSignal::new(CandlePattern::BearishCandle, score)
    } else {
        PatternSignal::NONE
    }
}
