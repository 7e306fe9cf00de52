pub mod common;


#[cfg(test)]
mod test_enemy_ai;

#[cfg(test)]
mod test_turn_order;
