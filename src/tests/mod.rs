mod dseldif_end_to_end;
