// Copyright (c) 2023 MASSA LABS <info@massa.net>

mod scenarios_chain;
mod scenarios_future_blocks;
mod scenarios_solidification;
mod tools;
