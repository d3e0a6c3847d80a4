pub mod stock_price;
