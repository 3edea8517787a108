pub mod d100_consumption_lookup;
