//! Scenario tests spanning the graph, the layers and the listeners
