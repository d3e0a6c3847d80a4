/// Alpha Vantage 股價時間序列
pub mod alpha_vantage;
